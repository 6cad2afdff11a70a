use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Single-waiter completion flag with timeout.
///
/// The flag is sticky: a [`set_signal`](Self::set_signal) that lands before
/// anyone waits is observed by the next wait. A successful wait consumes the
/// flag, so one signal releases exactly one wait.
#[derive(Debug, Default)]
pub struct CompletionSignal {
	signaled: Mutex<bool>,
	cond: Condvar,
}

impl CompletionSignal {
	/// Creates an unsignaled instance.
	pub fn new() -> Self {
		Self::default()
	}

	/// Raises the flag and wakes the waiter, if any. Repeated calls before a
	/// wait collapse into one signal.
	pub fn set_signal(&self) {
		let mut signaled = self.signaled.lock();
		*signaled = true;
		self.cond.notify_one();
	}

	/// Waits up to `timeout` for the flag. Returns `true` and clears the flag
	/// if it was raised, `false` on timeout.
	pub fn wait_for_signal(&self, timeout: Duration) -> bool {
		let mut signaled = self.signaled.lock();
		// Overflowing deadlines degrade to an unbounded wait.
		match Instant::now().checked_add(timeout) {
			Some(deadline) => {
				while !*signaled {
					if self.cond.wait_until(&mut signaled, deadline).timed_out() {
						break;
					}
				}
			}
			None => {
				while !*signaled {
					self.cond.wait(&mut signaled);
				}
			}
		}
		std::mem::replace(&mut *signaled, false)
	}

	/// Returns whether the flag is currently raised, without consuming it.
	pub fn is_signaled(&self) -> bool {
		*self.signaled.lock()
	}

	/// Clears the flag.
	pub fn reset(&self) {
		*self.signaled.lock() = false;
	}
}
