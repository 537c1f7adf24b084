use super::{
	LowLevel,
	Timing,
	UnioError,
};

pub const START_HEADER: u8 = 0x55;

/// Frames: byte sequences closed by a MAK on their last byte, plus the
/// line conditions around them.
pub trait Frames: LowLevel {
	// resets the slave's state machine; needed before every new transaction.
	//
	// never call this inside a critical section: the recovery phase is long
	// and may be preempted freely.
	fn standby_pulse(&mut self, timing: &Timing) {
		self.set_level(false);
		self.set_output();
		self.delay_us(timing.standby_low_us());
		self.set_level(true);
		self.delay_us(timing.standby_recovery_us());
	}

	// keep the line idle between two commands that don't need a standby
	// pulse in between
	fn inter_command_gap(&mut self, timing: &Timing) {
		self.set_level(true);
		self.delay_us(timing.inter_command_gap_us());
	}

	// the slave doesn't acknowledge the header, its SAK slot is just clocked
	fn start_header(&mut self, timing: &Timing) {
		self.set_level(false);
		self.delay_us(timing.start_header_hold_us());
		self.send_byte(timing, START_HEADER, true);
	}

	// send `data` in order; only the last byte of a final frame gets MAK=1.
	//
	// stops at the first byte the slave doesn't acknowledge.
	fn send_frame(&mut self, timing: &Timing, data: &[u8], end: bool) -> crate::AResult<()> {
		trace!("send frame {:02x?} (end: {})", data, end);
		for (index, &byte) in data.iter().enumerate() {
			let last = end && index + 1 == data.len();
			if !self.send_byte(timing, byte, last) {
				return Err(UnioError::NoAcknowledge { index }.into());
			}
		}
		Ok(())
	}

	// receive `len` bytes; the last one is closed with MAK=1
	fn receive_frame(&mut self, timing: &Timing, len: usize) -> crate::AResult<Vec<u8>> {
		let mut data = Vec::with_capacity(len);
		for index in 0..len {
			let byte = match self.receive_byte(timing, index + 1 == len) {
				Ok(byte) => byte,
				Err(_) => return Err(UnioError::NoAcknowledge { index }.into()),
			};
			data.push(byte);
		}
		trace!("received frame {:02x?}", data);
		Ok(data)
	}
}

impl<L: LowLevel + ?Sized> Frames for L {
}
