use failure::Fail;

#[derive(Clone, PartialEq, Eq, Debug, Fail)]
pub enum UnioError {
	/// the slave didn't assert SAK after byte `index` of a frame; bus noise,
	/// wrong device address or no device at all
	#[fail(display = "no acknowledge from device after byte {} of frame", index)]
	NoAcknowledge { index: usize },

	/// write would straddle a physical page; rejected before any bus activity
	#[fail(display = "write of {} bytes at 0x{:04x} crosses a page boundary", length, address)]
	PageBoundary { address: u16, length: usize },

	#[fail(display = "{} bytes at 0x{:04x} run past the end of the address space", length, address)]
	AddressOverflow { address: u16, length: usize },

	#[fail(display = "write still in progress after {} status polls", polls)]
	Timeout { polls: usize },
}

/// Find the `UnioError` a failure originated from, looking through any
/// context that was added on the way up.
pub fn error_kind(e: &failure::Error) -> Option<&UnioError> {
	e.find_root_cause().downcast_ref::<UnioError>()
}
