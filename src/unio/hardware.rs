use std::thread;
use std::time::{
	Duration,
	Instant,
};

// delays up to this long are spun, anything longer sleeps
const SPIN_LIMIT: Duration = Duration::from_micros(100);

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

pub fn busy_wait(duration: Duration) {
	let start = Instant::now();
	while start.elapsed() < duration {
		std::hint::spin_loop();
	}
}

/// The single bidirectional line the EEPROM hangs on.
///
/// Every call takes effect immediately; there is no buffering between the
/// driver and the pin.
pub trait Line {
	fn set_output(&mut self);
	fn set_input(&mut self);

	// only meaningful in output mode
	fn set_level(&mut self, high: bool);

	// only meaningful in input mode (output mode reads back the driven level)
	fn read_level(&mut self) -> bool;

	// delay for (at least) `us` microseconds
	fn delay_us(&mut self, us: u32) {
		let duration = Duration::from_micros(us as u64);
		if duration <= SPIN_LIMIT {
			busy_wait(duration);
		} else {
			reliable_sleep(duration);
		}
	}

	/// Called when a critical section is entered; should keep the scheduler
	/// from preempting the calling thread until `restore_preemption`.
	fn suppress_preemption(&mut self) {
	}

	fn restore_preemption(&mut self) {
	}
}

impl<'a, L: ?Sized + Line> Line for &'a mut L {
	fn set_output(&mut self) {
		L::set_output(*self)
	}
	fn set_input(&mut self) {
		L::set_input(*self)
	}
	fn set_level(&mut self, high: bool) {
		L::set_level(*self, high)
	}
	fn read_level(&mut self) -> bool {
		L::read_level(*self)
	}
	fn delay_us(&mut self, us: u32) {
		L::delay_us(*self, us)
	}
	fn suppress_preemption(&mut self) {
		L::suppress_preemption(*self)
	}
	fn restore_preemption(&mut self) {
		L::restore_preemption(*self)
	}
}

#[cfg(test)]
mod test {
	use std::time::{
		Duration,
		Instant,
	};

	#[test]
	fn waits_are_never_short() {
		let start = Instant::now();
		super::busy_wait(Duration::from_micros(50));
		assert!(start.elapsed() >= Duration::from_micros(50));

		let start = Instant::now();
		super::reliable_sleep(Duration::from_micros(700));
		assert!(start.elapsed() >= Duration::from_micros(700));
	}
}
