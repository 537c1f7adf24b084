use super::{
	Line,
	Timing,
	UnioError,
};

/// Bit and byte transfers on top of a `Line`.
///
/// A bit is a Manchester coded period of four quarter-bits: a "1" is a
/// rising edge in the middle of the period, a "0" a falling edge. The line
/// is sampled once in each half; only a low→high transition counts as 1,
/// so a bus nobody drives (pulled up) reads as 0.
pub trait LowLevel: Line {
	// drive the complement of `data` for the first half and `data` for the
	// second half, sampling in both halves.
	//
	// In input mode the writes are no-ops and this just clocks in one bit
	// sent by the slave. Timing doesn't depend on the value.
	fn transfer_bit(&mut self, timing: &Timing, data: bool) -> bool {
		let quarter = timing.quarter_bit_us();

		self.set_level(!data);
		self.delay_us(quarter);
		let a = self.read_level();
		self.delay_us(quarter);

		self.set_level(data);
		self.delay_us(quarter);
		let b = self.read_level();
		self.delay_us(quarter);

		b && !a
	}

	fn receive_bit(&mut self, timing: &Timing) -> bool {
		self.set_input();
		let bit = self.transfer_bit(timing, true);
		self.set_output();
		bit
	}

	// send 8 bits (highest first), then MAK, then read SAK
	//
	// returns whether the slave acknowledged the byte
	fn send_byte(&mut self, timing: &Timing, byte: u8, last: bool) -> bool {
		for bit in (0..8).rev() {
			self.transfer_bit(timing, 0 != byte & (1 << bit));
		}
		self.transfer_bit(timing, last);
		self.receive_bit(timing)
	}

	// clock in 8 bits (highest first), then send MAK and read SAK
	fn receive_byte(&mut self, timing: &Timing, last: bool) -> crate::AResult<u8> {
		let mut byte = 0u8;
		self.set_input();
		for _ in 0..8 {
			byte = (byte << 1) | (self.transfer_bit(timing, true) as u8);
		}
		self.set_output();

		self.transfer_bit(timing, last);
		if !self.receive_bit(timing) {
			return Err(UnioError::NoAcknowledge { index: 0 }.into());
		}
		Ok(byte)
	}
}

impl<L: Line + ?Sized> LowLevel for L {
}
