/// Bus timing in microseconds.
///
/// The defaults are the protocol minimums; `fudge` is added on top of every
/// delay to absorb scheduling jitter. Sleeping longer is harmless, sleeping
/// shorter corrupts the transfer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Timing {
	/// quarter of a bit period; a bit takes four of them
	pub quarter_bit: u32,
	/// standby pulse: low phase ("TSS")
	pub standby_low: u32,
	/// standby pulse: high phase until the slave is ready ("TSTBY")
	pub standby_recovery: u32,
	/// low phase before the start header byte ("THDR")
	pub start_header_hold: u32,
	/// idle high time between two commands without a standby pulse
	pub inter_command_gap: u32,
	pub fudge: u32,
}

impl Timing {
	pub const PROTOCOL: Timing = Timing {
		quarter_bit: 10,
		standby_low: 10,
		standby_recovery: 600,
		start_header_hold: 5,
		inter_command_gap: 10,
		fudge: 5,
	};

	pub fn quarter_bit_us(&self) -> u32 {
		self.quarter_bit + self.fudge
	}

	pub fn standby_low_us(&self) -> u32 {
		self.standby_low + self.fudge
	}

	pub fn standby_recovery_us(&self) -> u32 {
		self.standby_recovery + self.fudge
	}

	pub fn start_header_hold_us(&self) -> u32 {
		self.start_header_hold + self.fudge
	}

	pub fn inter_command_gap_us(&self) -> u32 {
		self.inter_command_gap + self.fudge
	}

	/// duration of one bit on the wire (value independent)
	pub fn bit_period_us(&self) -> u32 {
		4 * self.quarter_bit_us()
	}
}

impl Default for Timing {
	fn default() -> Self {
		Timing::PROTOCOL
	}
}
