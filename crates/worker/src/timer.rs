//! One-shot delayed submission onto a worker.
//!
//! Deadlines are tracked on the shared timer clock thread. When one elapses
//! the bound operation is enqueued on its worker like any other request; the
//! clock thread never runs it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::confined::Confined;
use crate::context::WorkerContext;
use crate::spawn::spawn_clock_task;
use crate::thread::WorkerHandle;
use crate::token::{GenerationClock, GenerationToken};

type TimerOp = Arc<dyn Fn(&mut WorkerContext) + Send + Sync>;

/// State of the current arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
	/// Never started.
	Idle,
	/// Waiting for the deadline.
	Armed,
	/// Deadline reached and the request was submitted.
	Fired,
	/// Stopped before the deadline.
	Cancelled,
	/// Deadline reached but the worker refused the request.
	Rejected,
}

struct Arming {
	state: TimerState,
	token: Option<GenerationToken>,
}

struct TimerInner {
	worker: WorkerHandle,
	op: TimerOp,
	arming: Mutex<Arming>,
	clock: GenerationClock,
	fired: AtomicU64,
}

impl TimerInner {
	fn fire(&self, generation: u64) {
		let mut arming = self.arming.lock();
		let current = arming.state == TimerState::Armed && arming.token.as_ref().is_some_and(|t| t.generation() == generation);
		if !current {
			tracing::trace!(worker = %self.worker.name(), generation, "timer.fire.stale");
			return;
		}
		arming.token = None;

		// Posted under the arming lock: `stop` never reports a cancel for a
		// request already queued.
		let op = Arc::clone(&self.op);
		match self.worker.post(move |ctx| op(ctx)) {
			Ok(()) => {
				arming.state = TimerState::Fired;
				self.fired.fetch_add(1, Ordering::Relaxed);
				tracing::trace!(worker = %self.worker.name(), generation, "timer.fire");
			}
			Err(err) => {
				arming.state = TimerState::Rejected;
				tracing::warn!(worker = %self.worker.name(), generation, error = %err, "timer.fire.rejected");
			}
		}
	}

	/// Replaces any pending deadline with a new arming. Caller holds the lock.
	fn arm(&self, arming: &mut Arming) -> GenerationToken {
		if let Some(previous) = arming.token.take() {
			previous.cancel();
		}
		let token = GenerationToken::new(self.clock.next());
		arming.token = Some(token.clone());
		arming.state = TimerState::Armed;
		token
	}

	fn schedule(self: &Arc<Self>, token: GenerationToken, delay: Duration) {
		tracing::trace!(worker = %self.worker.name(), generation = token.generation(), ?delay, "timer.start");
		spawn_clock_task(fire_after(Arc::downgrade(self), token, delay));
	}
}

/// One-shot timer bound to a zero-argument operation on a worker.
///
/// Dropping the timer cancels a pending firing.
pub struct Timer {
	inner: Arc<TimerInner>,
}

impl Timer {
	/// Binds `op` to run on `worker` when the timer fires.
	pub fn new<F>(worker: &WorkerHandle, op: F) -> Self
	where
		F: Fn() + Send + Sync + 'static,
	{
		Self::with_context(worker, move |_| op())
	}

	/// Binds an operation that receives the worker's context.
	pub fn with_context<F>(worker: &WorkerHandle, op: F) -> Self
	where
		F: Fn(&mut WorkerContext) + Send + Sync + 'static,
	{
		Self {
			inner: Arc::new(TimerInner {
				worker: worker.clone(),
				op: Arc::new(op),
				arming: Mutex::new(Arming {
					state: TimerState::Idle,
					token: None,
				}),
				clock: GenerationClock::default(),
				fired: AtomicU64::new(0),
			}),
		}
	}

	/// Binds an operation on a confined value.
	pub fn for_target<T, F>(target: &Confined<T>, op: F) -> Self
	where
		T: 'static,
		F: Fn(&mut T) + Send + Sync + 'static,
	{
		let slot = target.slot();
		Self::with_context(target.worker(), move |ctx| match ctx.get_mut::<T>(slot) {
			Some(value) => op(value),
			None => tracing::warn!(worker = %ctx.worker().name(), slot = %slot, "timer.target.missing"),
		})
	}

	/// Arms the timer to fire once after `delay`. Re-arming replaces any
	/// pending deadline.
	pub fn start(&self, delay: Duration) {
		let token = self.inner.arm(&mut self.inner.arming.lock());
		self.inner.schedule(token, delay);
	}

	/// Arms the timer unless a deadline is already pending. Returns true if
	/// this call armed it.
	pub fn start_unless_armed(&self, delay: Duration) -> bool {
		let token = {
			let mut arming = self.inner.arming.lock();
			if arming.state == TimerState::Armed {
				return false;
			}
			self.inner.arm(&mut arming)
		};
		self.inner.schedule(token, delay);
		true
	}

	/// Cancels a pending firing. Returns true if one was cancelled.
	pub fn stop(&self) -> bool {
		let mut arming = self.inner.arming.lock();
		if arming.state != TimerState::Armed {
			return false;
		}
		if let Some(token) = arming.token.take() {
			token.cancel();
		}
		arming.state = TimerState::Cancelled;
		tracing::trace!(worker = %self.inner.worker.name(), "timer.stop");
		true
	}

	/// State of the current arming.
	pub fn state(&self) -> TimerState {
		self.inner.arming.lock().state
	}

	/// Whether a deadline is pending.
	pub fn is_armed(&self) -> bool {
		self.state() == TimerState::Armed
	}

	/// Number of firings the worker accepted.
	pub fn fire_count(&self) -> u64 {
		self.inner.fired.load(Ordering::Relaxed)
	}
}

impl Drop for Timer {
	fn drop(&mut self) {
		self.stop();
	}
}

impl fmt::Debug for Timer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Timer")
			.field("worker", &self.inner.worker.name())
			.field("state", &self.state())
			.finish()
	}
}

async fn fire_after(inner: Weak<TimerInner>, token: GenerationToken, delay: Duration) {
	tokio::select! {
		biased;
		_ = token.cancelled() => return,
		_ = tokio::time::sleep(delay) => {}
	}
	if let Some(inner) = inner.upgrade() {
		inner.fire(token.generation());
	}
}
