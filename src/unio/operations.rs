use std::fmt;
use std::time::Duration;

use super::hardware::reliable_sleep;
use super::{
	Command,
	CriticalSection,
	Frames,
	Line,
	Timing,
	UnioError,
};

/// physical write granularity; a write may not cross a page
pub const PAGE_SIZE: usize = 16;
pub const ADDRESS_SPACE: usize = 0x1_0000;
pub const DEFAULT_POLL_LIMIT: usize = 200;

const STATUS_WRITE_IN_PROGRESS: u8 = 0x01;
const STATUS_WRITE_ENABLED: u8 = 0x02;
const STATUS_BLOCK_PROTECTION_MASK: u8 = 0x0c;
const STATUS_BLOCK_PROTECTION_SHIFT: u8 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub u8);

impl Status {
	pub fn is_write_in_progress(&self) -> bool {
		0 != self.0 & STATUS_WRITE_IN_PROGRESS
	}

	pub fn is_write_enabled(&self) -> bool {
		0 != self.0 & STATUS_WRITE_ENABLED
	}

	// 0: nothing protected .. 3: everything protected
	pub fn block_protection(&self) -> u8 {
		(self.0 & STATUS_BLOCK_PROTECTION_MASK) >> STATUS_BLOCK_PROTECTION_SHIFT
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (block protection: {}", self.0, self.block_protection())?;
		if self.is_write_in_progress() { write!(f, " [WIP]")?; }
		if self.is_write_enabled() { write!(f, " [WEL]")?; }
		write!(f, ")")
	}
}

fn check_range(address: u16, length: usize) -> crate::AResult<()> {
	if address as usize + length > ADDRESS_SPACE {
		return Err(UnioError::AddressOverflow { address, length }.into());
	}
	Ok(())
}

/// A UNIO EEPROM with a fixed device address on its own line.
///
/// Every operation is a full transaction: standby pulse, then start
/// header, command frame and data frame inside a critical section. A failed
/// transaction leaves the slave in an unknown framing state; the next
/// operation resynchronizes it with its own standby pulse.
pub struct Eeprom<L: Line> {
	line: L,
	device: u8,
	timing: Timing,
	poll_limit: usize,
}

impl<L: Line> Eeprom<L> {
	pub fn new(line: L, device: u8) -> Self {
		Self::with_timing(line, device, Timing::default())
	}

	pub fn with_timing(mut line: L, device: u8, timing: Timing) -> Self {
		line.set_level(true);
		line.set_output();
		Eeprom {
			line,
			device,
			timing,
			poll_limit: DEFAULT_POLL_LIMIT,
		}
	}

	/// maximum number of status polls `await_write_complete` does (at
	/// least one)
	pub fn with_poll_limit(mut self, polls: usize) -> Self {
		self.poll_limit = polls.max(1);
		self
	}

	pub fn device(&self) -> u8 {
		self.device
	}

	pub fn line(&self) -> &L {
		&self.line
	}

	// start header and command frame, then `data` for the data frame; all
	// in one critical section
	fn guarded<F, R>(&mut self, command: Command, data: F) -> crate::AResult<R>
	where
		F: FnOnce(&mut L, &Timing) -> crate::AResult<R>,
	{
		let timing = self.timing;
		let frame = command.frame(self.device);

		let mut cs = CriticalSection::enter(&mut self.line);
		cs.start_header(&timing);
		cs.send_frame(&timing, frame.as_bytes(), !command.has_data())?;
		data(&mut *cs, &timing)
	}

	fn transaction<F, R>(&mut self, command: Command, data: F) -> crate::AResult<R>
	where
		F: FnOnce(&mut L, &Timing) -> crate::AResult<R>,
	{
		debug!("device 0x{:02x}: {:?}", self.device, command);
		let timing = self.timing;
		self.line.standby_pulse(&timing);
		self.guarded(command, data)
	}

	pub fn read(&mut self, address: u16, length: usize) -> crate::AResult<Vec<u8>> {
		if 0 == length {
			return Ok(Vec::new());
		}
		check_range(address, length)?;
		self.transaction(Command::Read { address }, |line, timing| {
			line.receive_frame(timing, length)
		})
	}

	/// Write within a single page; needs `enable_write` first, and
	/// `await_write_complete` afterwards.
	pub fn write(&mut self, address: u16, data: &[u8]) -> crate::AResult<()> {
		ensure!(!data.is_empty(), "empty write at 0x{:04x}", address);
		if (address as usize % PAGE_SIZE) + data.len() > PAGE_SIZE {
			return Err(UnioError::PageBoundary { address, length: data.len() }.into());
		}
		self.transaction(Command::Write { address }, |line, timing| {
			line.send_frame(timing, data, true)
		})
	}

	pub fn enable_write(&mut self) -> crate::AResult<()> {
		self.transaction(Command::WriteEnable, |_, _| Ok(()))
	}

	pub fn disable_write(&mut self) -> crate::AResult<()> {
		self.transaction(Command::WriteDisable, |_, _| Ok(()))
	}

	pub fn read_status(&mut self) -> crate::AResult<Status> {
		self.transaction(Command::ReadStatus, |line, timing| {
			let data = line.receive_frame(timing, 1)?;
			Ok(Status(data[0]))
		})
	}

	/// Needs `enable_write` first like any other write.
	pub fn write_status(&mut self, status: u8) -> crate::AResult<()> {
		self.transaction(Command::WriteStatus { status }, |_, _| Ok(()))
	}

	/// Poll the status register until the write in progress is done.
	///
	/// Gives up with `UnioError::Timeout` after the poll limit.
	pub fn await_write_complete(&mut self) -> crate::AResult<()> {
		let timing = self.timing;
		self.line.standby_pulse(&timing);
		for poll in 1..=self.poll_limit {
			self.line.inter_command_gap(&timing);
			let status = self.guarded(Command::ReadStatus, |line, timing| {
				let data = line.receive_frame(timing, 1)?;
				Ok(Status(data[0]))
			})?;
			if !status.is_write_in_progress() {
				debug!("device 0x{:02x}: write complete after {} polls", self.device, poll);
				return Ok(());
			}
		}
		Err(UnioError::Timeout { polls: self.poll_limit }.into())
	}

	/// Write any range, split at page boundaries; every page gets its own
	/// enable, write and wait.
	pub fn paged_write(&mut self, address: u16, data: &[u8]) -> crate::AResult<()> {
		check_range(address, data.len())?;
		let mut address = address as usize;
		let mut rest = data;
		while !rest.is_empty() {
			let len = rest.len().min(PAGE_SIZE - address % PAGE_SIZE);
			let (page, tail) = rest.split_at(len);
			with_context!(("write {} bytes at 0x{:04x}", len, address), {
				self.enable_write()?;
				self.write(address as u16, page)?;
				self.await_write_complete()
			})?;
			address += len;
			rest = tail;
		}
		Ok(())
	}

	fn write_all(&mut self, command: Command) -> crate::AResult<()> {
		self.enable_write()?;
		self.transaction(command, |_, _| Ok(()))?;
		self.await_write_complete()
	}

	/// set every byte to 0x00
	pub fn erase_all(&mut self) -> crate::AResult<()> {
		self.write_all(Command::EraseAll)
	}

	/// set every byte to 0xff
	pub fn set_all(&mut self) -> crate::AResult<()> {
		self.write_all(Command::SetAll)
	}

	/// Read the status register until the device answers, at most
	/// `attempts` times with `pause` in between.
	pub fn detect(&mut self, attempts: usize, pause: Duration) -> crate::AResult<Status> {
		let mut attempt = 1;
		loop {
			match self.read_status() {
				Ok(status) => return Ok(status),
				Err(e) => {
					if attempt >= attempts {
						return Err(e);
					}
					info!("No answer from device 0x{:02x} ({}), retrying", self.device, e);
				},
			}
			attempt += 1;
			reliable_sleep(pause);
		}
	}
}
