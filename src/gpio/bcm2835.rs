use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::io::{
	FromRawFd,
};
use std::ptr;

use libc::{
	MAP_FAILED,
	MAP_SHARED,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	PROT_READ,
	PROT_WRITE,
	c_void,
	mmap,
	munmap,
	open,
};

use crate::unio::Line;

use super::Realtime;

// GPIO block as seen through /dev/gpiomem (offset 0 = GPIO base)
const GPIOMEM: &str = "/dev/gpiomem";
const BLOCK_SIZE: usize = 4096;

const GPFSEL0: usize = 0x00;
const GPSET0: usize = 0x1c;
const GPCLR0: usize = 0x28;
const GPLEV0: usize = 0x34;

const FSEL_INPUT: u32 = 0b000;
const FSEL_OUTPUT: u32 = 0b001;
const FSEL_MASK: u32 = 0b111;

pub const PIN_COUNT: u8 = 54;

// register offset and shift of a pin's 3-bit function select field
fn function_select(pin: u8) -> (usize, u32) {
	assert!(pin < PIN_COUNT);
	(GPFSEL0 + 4 * (pin as usize / 10), 3 * (pin as u32 % 10))
}

// register offset (relative to a SET/CLR/LEV base) and bit of a pin
fn bank(pin: u8) -> (usize, u32) {
	assert!(pin < PIN_COUNT);
	(4 * (pin as usize / 32), 1u32 << (pin % 32))
}

#[derive(Debug)]
struct Mapped {
	ptr: ptr::NonNull<u8>, // u8 instead of void for easier offset operations
	len: usize,
}

impl Drop for Mapped {
	fn drop(&mut self) {
		let res = unsafe {
			munmap(
				self.ptr.as_ptr() as *mut c_void,
				self.len,
			)
		};
		if 0 != res {
			error!("munmap of {} failed: {}", GPIOMEM, io::Error::last_os_error());
		}
	}
}

impl Mapped {
	fn open() -> io::Result<Mapped> {
		let path = CString::new(GPIOMEM)?;

		let fd = unsafe { open(path.as_ptr(), O_RDWR | O_SYNC | O_CLOEXEC) };
		if -1 == fd {
			return Err(io::Error::last_os_error());
		}
		// now get fd managed to prevent resource leak; the mapping survives closing it
		let _f = unsafe { fs::File::from_raw_fd(fd) };

		let area = unsafe {
			mmap(
				ptr::null_mut(),
				BLOCK_SIZE,
				PROT_READ | PROT_WRITE,
				MAP_SHARED,
				fd,
				0,
			)
		};
		if MAP_FAILED == area {
			return Err(io::Error::last_os_error());
		}
		match ptr::NonNull::new(area as *mut u8) {
			None => Err(io::Error::new(io::ErrorKind::Other, "mmap returned NULL")),
			Some(ptr) => Ok(Mapped {
				ptr,
				len: BLOCK_SIZE,
			}),
		}
	}

	fn read_dword(&self, offset: usize) -> u32 {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		unsafe { ptr::read_volatile(self.ptr.as_ptr().add(offset) as *const u32) }
	}

	fn write_dword(&mut self, offset: usize, data: u32) {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		unsafe { ptr::write_volatile(self.ptr.as_ptr().add(offset) as *mut u32, data) }
	}
}

/// One pin of the BCM2835 (and compatible) GPIO block, the way the UNIO
/// line is wired on a Raspberry Pi.
///
/// Pins use BCM numbering; physical header pin 8 is GPIO 14. The line
/// needs an external pull-up (or the slave's) to idle high in input mode.
pub struct Bcm2835Gpio {
	map: Mapped,
	pin: u8,
	realtime: Realtime,
}

impl Bcm2835Gpio {
	pub fn open(pin: u8) -> io::Result<Self> {
		if pin >= PIN_COUNT {
			return Err(io::Error::new(
				io::ErrorKind::InvalidInput,
				format!("GPIO {} doesn't exist (only {} pins)", pin, PIN_COUNT),
			));
		}
		let map = Mapped::open()?;
		debug!("mapped {} for GPIO {}", GPIOMEM, pin);
		Ok(Bcm2835Gpio {
			map,
			pin,
			realtime: Realtime::new(),
		})
	}

	pub fn pin(&self) -> u8 {
		self.pin
	}

	fn select(&mut self, function: u32) {
		let (offset, shift) = function_select(self.pin);
		let fsel = self.map.read_dword(offset);
		self.map.write_dword(offset, (fsel & !(FSEL_MASK << shift)) | (function << shift));
	}
}

impl Line for Bcm2835Gpio {
	fn set_output(&mut self) {
		self.select(FSEL_OUTPUT);
	}

	fn set_input(&mut self) {
		self.select(FSEL_INPUT);
	}

	// the output latch is written in input mode too, and takes effect once
	// the pin is switched back to output
	fn set_level(&mut self, high: bool) {
		let (offset, bit) = bank(self.pin);
		let base = if high { GPSET0 } else { GPCLR0 };
		self.map.write_dword(base + offset, bit);
	}

	fn read_level(&mut self) -> bool {
		let (offset, bit) = bank(self.pin);
		0 != self.map.read_dword(GPLEV0 + offset) & bit
	}

	fn suppress_preemption(&mut self) {
		self.realtime.enter();
	}

	fn restore_preemption(&mut self) {
		self.realtime.leave();
	}
}

impl Drop for Bcm2835Gpio {
	fn drop(&mut self) {
		// release the line, leaving it to the pull-up
		self.set_input();
	}
}
