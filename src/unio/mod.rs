//! UNIO: single wire serial protocol of the Microchip 11XX EEPROMs
//!
//! Everything runs over one bidirectional line; there is no clock. Each bit
//! is a Manchester coded period (rising edge in the middle: 1, falling
//! edge: 0), sampled once per half-period by the master.
//!
//! A transaction:
//! - standby pulse: line low for TSS, high for TSTBY (resets the slave)
//! - start header: line low for THDR, then 0x55
//! - command frame: device address, opcode, optionally address / status
//! - optional data frame, sent or received
//!
//! Every byte is followed by two handshake bits: MAK driven by the master
//! (set on the last byte of the final frame), then SAK driven by the slave
//! (which must be set, or the whole transaction is lost).
//!
//! Opcodes:
//! - 0x03 READ @ 16-bit address, recv DATA
//! - 0x6c WRITE @ 16-bit address, send DATA (within one 16-byte page)
//! - 0x96 WREN (write enable), 0x91 WRDI (write disable)
//! - 0x05 RDSR (read status), 0x6e WRSR (write status)
//! - 0x6d ERAL (erase all), 0x67 SETAL (set all)
//!
//! The bits are software timed. Preemption inside a bit corrupts it without
//! anything noticing; the `CriticalSection` around each transaction is the
//! only protection there is.

mod command;
mod error;
mod frame;
mod guard;
mod hardware;
mod low_level;
mod operations;
mod timing;

#[cfg(test)]
pub(crate) mod sim;

pub use self::command::{
	Command,
	CommandFrame,
	Opcode,
};

pub use self::error::{
	UnioError,
	error_kind,
};

pub use self::frame::{
	Frames,
	START_HEADER,
};

pub use self::guard::CriticalSection;

pub use self::hardware::{
	Line,
	busy_wait,
	reliable_sleep,
};

pub use self::low_level::LowLevel;

pub use self::operations::{
	ADDRESS_SPACE,
	DEFAULT_POLL_LIMIT,
	Eeprom,
	PAGE_SIZE,
	Status,
};

pub use self::timing::Timing;
