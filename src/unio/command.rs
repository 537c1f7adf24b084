use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Opcode {
	Read = 0x03,
	Write = 0x6c,
	WriteEnable = 0x96,
	WriteDisable = 0x91,
	ReadStatus = 0x05,
	WriteStatus = 0x6e,
	EraseAll = 0x6d,
	SetAll = 0x67,
}

impl Opcode {
	pub const ALL: [Opcode; 8] = [
		Opcode::Read,
		Opcode::Write,
		Opcode::WriteEnable,
		Opcode::WriteDisable,
		Opcode::ReadStatus,
		Opcode::WriteStatus,
		Opcode::EraseAll,
		Opcode::SetAll,
	];

	pub fn from_byte(byte: u8) -> Option<Opcode> {
		Opcode::ALL.iter().cloned().find(|op| *op as u8 == byte)
	}

	/// bytes in the command frame, device address included
	pub fn frame_len(self) -> usize {
		match self {
			Opcode::Read | Opcode::Write => 4,
			Opcode::WriteStatus => 3,
			_ => 2,
		}
	}
}

/// A command with its operands; see `frame` for the bytes on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Command {
	Read { address: u16 },
	Write { address: u16 },
	WriteEnable,
	WriteDisable,
	ReadStatus,
	WriteStatus { status: u8 },
	EraseAll,
	SetAll,
}

impl Command {
	pub fn opcode(&self) -> Opcode {
		match *self {
			Command::Read { .. } => Opcode::Read,
			Command::Write { .. } => Opcode::Write,
			Command::WriteEnable => Opcode::WriteEnable,
			Command::WriteDisable => Opcode::WriteDisable,
			Command::ReadStatus => Opcode::ReadStatus,
			Command::WriteStatus { .. } => Opcode::WriteStatus,
			Command::EraseAll => Opcode::EraseAll,
			Command::SetAll => Opcode::SetAll,
		}
	}

	/// whether a data frame follows; if not the command frame is final
	pub fn has_data(&self) -> bool {
		match *self {
			Command::Read { .. } | Command::Write { .. } | Command::ReadStatus => true,
			_ => false,
		}
	}

	pub fn frame(&self, device: u8) -> CommandFrame {
		let opcode = self.opcode();
		let mut bytes = [device, opcode as u8, 0, 0];
		match *self {
			Command::Read { address } | Command::Write { address } => {
				bytes[2] = (address >> 8) as u8;
				bytes[3] = address as u8;
			},
			Command::WriteStatus { status } => {
				bytes[2] = status;
			},
			_ => (),
		}
		CommandFrame {
			bytes,
			len: opcode.frame_len(),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandFrame {
	bytes: [u8; 4],
	len: usize,
}

impl CommandFrame {
	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes[..self.len]
	}
}

impl fmt::Debug for CommandFrame {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:02x?}", self.as_bytes())
	}
}
