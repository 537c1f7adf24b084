use std::io;
use std::mem;

use libc::{
	SCHED_FIFO,
	c_int,
	sched_get_priority_max,
	sched_getparam,
	sched_getscheduler,
	sched_param,
	sched_setscheduler,
};

/// Critical sections for a userspace process: the calling thread runs as
/// SCHED_FIFO with the highest priority while inside, so ordinary tasks
/// can't preempt it.
///
/// Needs CAP_SYS_NICE (or root); without it the transfers still run, just
/// unprotected, and a warning is logged once.
pub struct Realtime {
	saved: Option<(c_int, sched_param)>,
	warned: bool,
}

impl Realtime {
	pub fn new() -> Self {
		Realtime {
			saved: None,
			warned: false,
		}
	}

	pub fn is_active(&self) -> bool {
		self.saved.is_some()
	}

	fn warn_once(&mut self, e: io::Error) {
		if !self.warned {
			warn!("Can't switch to realtime scheduling, bit timing may suffer: {}", e);
			self.warned = true;
		}
	}

	pub fn enter(&mut self) {
		if self.saved.is_some() {
			return;
		}

		let policy = unsafe { sched_getscheduler(0) };
		if -1 == policy {
			return self.warn_once(io::Error::last_os_error());
		}
		let mut previous: sched_param = unsafe { mem::zeroed() };
		if -1 == unsafe { sched_getparam(0, &mut previous) } {
			return self.warn_once(io::Error::last_os_error());
		}

		let mut param: sched_param = unsafe { mem::zeroed() };
		param.sched_priority = unsafe { sched_get_priority_max(SCHED_FIFO) };
		if -1 == unsafe { sched_setscheduler(0, SCHED_FIFO, &param) } {
			return self.warn_once(io::Error::last_os_error());
		}

		self.saved = Some((policy, previous));
	}

	pub fn leave(&mut self) {
		if let Some((policy, param)) = self.saved.take() {
			if -1 == unsafe { sched_setscheduler(0, policy, &param) } {
				error!("Failed to restore scheduling policy {}: {}", policy, io::Error::last_os_error());
			}
		}
	}
}

impl Drop for Realtime {
	fn drop(&mut self) {
		self.leave();
	}
}
