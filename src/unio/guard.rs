use std::ops::{
	Deref,
	DerefMut,
};

use super::Line;

/// Keeps the scheduler off the line while bits are on the wire.
///
/// A quarter-bit is only a few microseconds; getting preempted inside one
/// shifts the sample point and silently flips a bit. Nothing on the bus
/// detects that, so everything between the start header and the final SAK
/// has to run inside one of these.
///
/// Holding the `&mut` borrow makes nesting impossible; preemption is
/// restored on drop, also on early returns.
pub struct CriticalSection<'a, L: ?Sized + Line + 'a>(&'a mut L);

impl<'a, L: ?Sized + Line> CriticalSection<'a, L> {
	pub fn enter(line: &'a mut L) -> Self {
		line.suppress_preemption();
		CriticalSection(line)
	}
}

impl<'a, L: ?Sized + Line> Drop for CriticalSection<'a, L> {
	fn drop(&mut self) {
		self.0.restore_preemption();
	}
}

impl<'a, L: ?Sized + Line> Deref for CriticalSection<'a, L> {
	type Target = L;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<'a, L: ?Sized + Line> DerefMut for CriticalSection<'a, L> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.0
	}
}
