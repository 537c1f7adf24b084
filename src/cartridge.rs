/* reverse engineered */

//! Filament cartridge chip of the XYZprinting Da Vinci printers.
//!
//! The chip is a UNIO EEPROM at device address 0xa0. The first 128 bytes
//! hold two identical 64-byte blocks; numbers are little endian, the serial
//! number is a big endian counter.

use std::fmt;

use crate::unio::{
	Eeprom,
	Line,
};

pub const DEVICE_ADDRESS: u8 = 0xa0;

/// bytes the cartridge data occupies (both blocks)
pub const IMAGE_SIZE: usize = 128;
/// the second block mirrors the first one at this offset
pub const MIRROR_OFFSET: u16 = 64;

mod offsets {
	pub const CODE: u16 = 0x00; // 1 byte
	pub const MATERIAL: u16 = 0x01; // 1 byte
	pub const COLOR: u16 = 0x02; // 2 bytes
	pub const DATE: u16 = 0x05; // 4 bytes
	pub const TOTAL_LENGTH: u16 = 0x08; // 4 bytes
	pub const NEW_LENGTH: u16 = 0x0c; // 4 bytes
	pub const HEAD_TEMP: u16 = 0x10; // 2 bytes
	pub const BED_TEMP: u16 = 0x12; // 2 bytes
	pub const MLOC: u16 = 0x14; // 2 bytes
	pub const DLOC: u16 = 0x16; // 2 bytes
	pub const SERIAL: u16 = 0x18; // 12 bytes
	pub const CRC: u16 = 0x24; // 2 bytes
	pub const LENGTH2: u16 = 0x34; // 4 bytes
}

pub use self::offsets::*;

pub const SERIAL_LEN: usize = 12;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Material {
	Abs,
	Pla,
	Flex,
	Unknown(u8),
}

impl Material {
	pub fn from_byte(byte: u8) -> Self {
		match byte {
			0x41 => Material::Abs,
			0x50 => Material::Pla,
			0x46 => Material::Flex,
			other => Material::Unknown(other),
		}
	}

	pub fn to_byte(self) -> u8 {
		match self {
			Material::Abs => 0x41,
			Material::Pla => 0x50,
			Material::Flex => 0x46,
			Material::Unknown(other) => other,
		}
	}
}

impl fmt::Display for Material {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Material::Abs => write!(f, "ABS"),
			Material::Pla => write!(f, "PLA"),
			Material::Flex => write!(f, "Flex"),
			Material::Unknown(b) => write!(f, "unknown (0x{:02x})", b),
		}
	}
}

impl std::str::FromStr for Material {
	type Err = failure::Error;

	fn from_str(s: &str) -> crate::AResult<Self> {
		match &*s.to_ascii_lowercase() {
			"abs" => Ok(Material::Abs),
			"pla" => Ok(Material::Pla),
			"flex" => Ok(Material::Flex),
			_ => bail!("unknown material {:?} (expected abs, pla or flex)", s),
		}
	}
}

/// filament length presets in millimetres
pub const LENGTH_120M: u32 = 120_000;
pub const LENGTH_240M: u32 = 240_000;
pub const LENGTH_400M: u32 = 400_000;

pub fn length_preset(meters: u32) -> crate::AResult<u32> {
	match meters {
		120 => Ok(LENGTH_120M),
		240 => Ok(LENGTH_240M),
		400 => Ok(LENGTH_400M),
		_ => bail!("no cartridge comes with {} m of filament (expected 120, 240 or 400)", meters),
	}
}

fn le16(data: &[u8], offset: u16) -> u16 {
	let o = offset as usize;
	(data[o] as u16) | (data[o + 1] as u16) << 8
}

fn le32(data: &[u8], offset: u16) -> u32 {
	let o = offset as usize;
	(data[o] as u32)
	| (data[o + 1] as u32) << 8
	| (data[o + 2] as u32) << 16
	| (data[o + 3] as u32) << 24
}

/// The interesting fields of one cartridge block.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Cartridge {
	pub code: u8,
	pub material: Material,
	pub color: u16,
	pub date: u32,
	/// millimetres
	pub total_length: u32,
	/// millimetres
	pub remaining_length: u32,
	/// °C
	pub head_temp: u16,
	/// °C
	pub bed_temp: u16,
	pub serial: [u8; SERIAL_LEN],
}

impl Cartridge {
	/// Decode the block starting at the beginning of `data`.
	pub fn decode(data: &[u8]) -> crate::AResult<Self> {
		ensure!(data.len() >= MIRROR_OFFSET as usize,
			"cartridge block needs {} bytes, got {}", MIRROR_OFFSET, data.len()
		);
		let mut serial = [0u8; SERIAL_LEN];
		serial.copy_from_slice(&data[SERIAL as usize..SERIAL as usize + SERIAL_LEN]);
		Ok(Cartridge {
			code: data[CODE as usize],
			material: Material::from_byte(data[MATERIAL as usize]),
			color: le16(data, COLOR),
			date: le32(data, DATE),
			total_length: le32(data, TOTAL_LENGTH),
			remaining_length: le32(data, NEW_LENGTH),
			head_temp: le16(data, HEAD_TEMP),
			bed_temp: le16(data, BED_TEMP),
			serial,
		})
	}
}

impl fmt::Display for Cartridge {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "code:      0x{:02x}", self.code)?;
		writeln!(f, "material:  {}", self.material)?;
		writeln!(f, "color:     0x{:04x}", self.color)?;
		writeln!(f, "length:    {} / {} mm", self.remaining_length, self.total_length)?;
		writeln!(f, "head temp: {} °C", self.head_temp)?;
		writeln!(f, "bed temp:  {} °C", self.bed_temp)?;
		write!(f, "serial:    ")?;
		for b in self.serial.iter() {
			write!(f, "{:02x}", b)?;
		}
		Ok(())
	}
}

/// Next serial number; the printer refuses serials it has seen before.
pub fn increment_serial(serial: &[u8; SERIAL_LEN]) -> [u8; SERIAL_LEN] {
	let mut next = *serial;
	for b in next.iter_mut().rev() {
		let (v, carry) = b.overflowing_add(1);
		*b = v;
		if !carry {
			break;
		}
	}
	next
}

pub fn hex_dump(base: usize, data: &[u8]) -> String {
	let mut out = String::new();
	for (i, line) in data.chunks(16).enumerate() {
		out.push_str(&format!("{:04x}:", base + 16 * i));
		for b in line {
			out.push_str(&format!(" {:02x}", b));
		}
		out.push('\n');
	}
	out
}

/// New values for a refilled cartridge.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Refill {
	pub material: Material,
	/// millimetres
	pub length: u32,
	pub head_temp: u16,
	pub bed_temp: u16,
	pub serial: [u8; SERIAL_LEN],
}

impl Refill {
	/// Starter ABS cartridge defaults: 120 m, 210 °C head, 90 °C bed.
	pub fn new(serial: [u8; SERIAL_LEN]) -> Self {
		Refill {
			material: Material::Abs,
			length: LENGTH_120M,
			head_temp: 210,
			bed_temp: 90,
			serial,
		}
	}

	/// (address, data) writes for both blocks
	pub fn plan(&self) -> Vec<(u16, Vec<u8>)> {
		let length = self.length.to_le_bytes().to_vec();
		let block = vec![
			(TOTAL_LENGTH, length.clone()),
			(NEW_LENGTH, length.clone()),
			(HEAD_TEMP, self.head_temp.to_le_bytes().to_vec()),
			(BED_TEMP, self.bed_temp.to_le_bytes().to_vec()),
			(MATERIAL, vec![self.material.to_byte()]),
			(SERIAL, self.serial.to_vec()),
			(LENGTH2, length),
		];
		let mirrored: Vec<(u16, Vec<u8>)> = block.iter()
			.map(|(offset, data)| (offset + MIRROR_OFFSET, data.clone()))
			.collect();
		block.into_iter().chain(mirrored).collect()
	}

	pub fn apply<L: Line>(&self, eeprom: &mut Eeprom<L>) -> crate::AResult<()> {
		for (address, data) in self.plan() {
			debug!("writing {:02x?} at 0x{:02x}", data, address);
			eeprom.paged_write(address, &data)?;
		}
		Ok(())
	}
}
