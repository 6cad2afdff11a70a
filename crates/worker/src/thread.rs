use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use crate::context::WorkerContext;
use crate::error::{EnqueueError, InvokeError, WorkerError};
use crate::mailbox::{Mailbox, MailboxSendError};
use crate::request::InvocationRequest;
use crate::signal::CompletionSignal;

/// Configuration for one worker thread.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
	pub(crate) name: String,
	pub(crate) stack_size: Option<usize>,
}

impl WorkerSpec {
	/// Worker configuration with the given thread name.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			stack_size: None,
		}
	}

	/// Sets the OS thread stack size.
	///
	/// # Panics
	///
	/// Panics if `bytes` is zero.
	#[must_use]
	pub fn stack_size(mut self, bytes: usize) -> Self {
		assert!(bytes > 0, "stack size must be > 0");
		self.stack_size = Some(bytes);
		self
	}
}

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
	/// Created but not started; enqueue fails.
	Idle,
	/// Accepting and executing requests.
	Running,
	/// Queue closed, draining.
	Stopping,
	/// Execution thread has exited.
	Stopped,
}

impl WorkerState {
	const fn from_u8(v: u8) -> Self {
		match v {
			0 => Self::Idle,
			1 => Self::Running,
			2 => Self::Stopping,
			_ => Self::Stopped,
		}
	}

	const fn as_u8(self) -> u8 {
		match self {
			Self::Idle => 0,
			Self::Running => 1,
			Self::Stopping => 2,
			Self::Stopped => 3,
		}
	}
}

/// Point-in-time counters for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStats {
	pub name: String,
	pub state: WorkerState,
	pub submitted: u64,
	pub executed: u64,
	pub panicked: u64,
	pub pending: usize,
}

/// Shutdown mode for a worker.
#[derive(Debug, Clone, Copy)]
pub enum ShutdownMode {
	/// Discard queued requests, finish the one in flight.
	Immediate,
	/// Run everything already queued, waiting up to `timeout`.
	Graceful { timeout: Duration },
}

/// Shutdown report for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
	completed: bool,
	timed_out: bool,
	discarded: usize,
}

impl ShutdownReport {
	/// The execution thread has exited.
	pub fn completed(&self) -> bool {
		self.completed
	}

	/// A graceful shutdown gave up waiting for the queue to drain.
	pub fn timed_out(&self) -> bool {
		self.timed_out
	}

	/// Requests dropped without running.
	pub fn discarded(&self) -> usize {
		self.discarded
	}
}

struct WorkerShared {
	name: String,
	mailbox: Mailbox<InvocationRequest>,
	state: AtomicU8,
	owner: OnceLock<ThreadId>,
	exited: CompletionSignal,
	submitted: AtomicU64,
	executed: AtomicU64,
	panicked: AtomicU64,
}

impl WorkerShared {
	fn state(&self) -> WorkerState {
		WorkerState::from_u8(self.state.load(Ordering::Acquire))
	}

	fn set_state(&self, state: WorkerState) {
		self.state.store(state.as_u8(), Ordering::Release);
	}
}

/// Cloneable submission handle for a worker thread.
///
/// Handles stay valid after the worker stops; enqueueing then fails with
/// [`EnqueueError::Closed`].
#[derive(Clone)]
pub struct WorkerHandle {
	shared: Arc<WorkerShared>,
}

impl WorkerHandle {
	/// Worker name, also used as the OS thread name.
	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// Current lifecycle state.
	pub fn state(&self) -> WorkerState {
		self.shared.state()
	}

	/// Whether the worker accepts requests.
	pub fn is_running(&self) -> bool {
		self.state() == WorkerState::Running
	}

	/// Whether the calling thread is this worker's execution thread.
	pub fn is_current(&self) -> bool {
		self.shared.owner.get().is_some_and(|id| *id == std::thread::current().id())
	}

	/// Pushes a request to the tail of the queue and wakes the execution loop.
	pub fn enqueue(&self, request: InvocationRequest) -> Result<(), EnqueueError> {
		match self.shared.mailbox.send(request) {
			Ok(depth) => {
				self.shared.submitted.fetch_add(1, Ordering::Relaxed);
				tracing::trace!(worker = %self.shared.name, pending = depth, "worker.enqueue");
				Ok(())
			}
			Err(MailboxSendError::NotOpen(_)) => Err(EnqueueError::NotRunning {
				worker: self.shared.name.clone(),
			}),
			Err(MailboxSendError::Closed(_)) => Err(EnqueueError::Closed {
				worker: self.shared.name.clone(),
			}),
		}
	}

	/// Runs `op` on the worker without waiting for it.
	pub fn post<F>(&self, op: F) -> Result<(), EnqueueError>
	where
		F: FnOnce(&mut WorkerContext) + Send + 'static,
	{
		self.enqueue(InvocationRequest::new(op))
	}

	/// Runs `op` on the worker and waits up to `timeout` for its return value.
	pub fn invoke<F, R>(&self, timeout: Duration, op: F) -> Result<R, InvokeError>
	where
		F: FnOnce(&mut WorkerContext) -> R + Send + 'static,
		R: Send + 'static,
	{
		self.guard_reentry()?;
		let (request, reply) = InvocationRequest::with_reply(op);
		self.enqueue(request)?;
		reply.wait(timeout)
	}

	/// Refuses a blocking wait on our own queue from inside the execution
	/// thread; the request could never run.
	pub(crate) fn guard_reentry(&self) -> Result<(), InvokeError> {
		if self.is_current() {
			return Err(InvokeError::WouldDeadlock {
				worker: self.shared.name.clone(),
			});
		}
		Ok(())
	}

	/// Snapshot of this worker's counters.
	pub fn stats(&self) -> WorkerStats {
		WorkerStats {
			name: self.shared.name.clone(),
			state: self.shared.state(),
			submitted: self.shared.submitted.load(Ordering::Relaxed),
			executed: self.shared.executed.load(Ordering::Relaxed),
			panicked: self.shared.panicked.load(Ordering::Relaxed),
			pending: self.shared.mailbox.len(),
		}
	}
}

impl fmt::Debug for WorkerHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerHandle")
			.field("name", &self.shared.name)
			.field("state", &self.shared.state())
			.finish()
	}
}

/// A dedicated OS thread executing queued requests one at a time, in order.
pub struct WorkerThread {
	spec: WorkerSpec,
	handle: WorkerHandle,
	join: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerThread {
	/// Creates a worker without starting it.
	pub fn new(spec: WorkerSpec) -> Self {
		let shared = Arc::new(WorkerShared {
			name: spec.name.clone(),
			mailbox: Mailbox::new(),
			state: AtomicU8::new(WorkerState::Idle.as_u8()),
			owner: OnceLock::new(),
			exited: CompletionSignal::new(),
			submitted: AtomicU64::new(0),
			executed: AtomicU64::new(0),
			panicked: AtomicU64::new(0),
		});
		Self {
			spec,
			handle: WorkerHandle { shared },
			join: Mutex::new(None),
		}
	}

	/// Creates and starts a worker.
	pub fn spawn(spec: WorkerSpec) -> Result<Self, WorkerError> {
		let worker = Self::new(spec);
		worker.start()?;
		Ok(worker)
	}

	/// Spawns the execution thread and opens the queue.
	pub fn start(&self) -> Result<(), WorkerError> {
		let mut join = self.join.lock();
		if join.is_some() || self.handle.state() != WorkerState::Idle {
			return Err(WorkerError::AlreadyStarted {
				worker: self.spec.name.clone(),
			});
		}

		let handle = self.handle.clone();
		let mut builder = std::thread::Builder::new().name(self.spec.name.clone());
		if let Some(bytes) = self.spec.stack_size {
			builder = builder.stack_size(bytes);
		}
		*join = Some(builder.spawn(move || run_worker(handle))?);

		// Open only after the thread exists so a failed spawn leaves the
		// worker refusing work.
		self.handle.shared.set_state(WorkerState::Running);
		self.handle.shared.mailbox.open();
		tracing::debug!(worker = %self.spec.name, "worker.start");
		Ok(())
	}

	/// Returns a cloneable submission handle.
	pub fn handle(&self) -> WorkerHandle {
		self.handle.clone()
	}

	/// Worker name.
	pub fn name(&self) -> &str {
		&self.spec.name
	}

	/// Stops the worker. Calling from the worker's own thread closes the queue
	/// without joining.
	pub fn shutdown(&self, mode: ShutdownMode) -> ShutdownReport {
		let shared = &self.handle.shared;
		if shared.state() == WorkerState::Idle {
			shared.mailbox.close();
			shared.set_state(WorkerState::Stopped);
			return ShutdownReport {
				completed: true,
				timed_out: false,
				discarded: 0,
			};
		}
		if shared.state() == WorkerState::Running {
			shared.set_state(WorkerState::Stopping);
		}

		let discarded = match mode {
			ShutdownMode::Immediate => {
				let dropped = shared.mailbox.close_and_drain();
				let count = dropped.len();
				drop(dropped);
				count
			}
			ShutdownMode::Graceful { .. } => {
				shared.mailbox.close();
				0
			}
		};

		if self.handle.is_current() {
			return ShutdownReport {
				completed: false,
				timed_out: false,
				discarded,
			};
		}

		let completed = match mode {
			ShutdownMode::Immediate => {
				self.join();
				true
			}
			ShutdownMode::Graceful { timeout } => {
				let exited = shared.state() == WorkerState::Stopped || shared.exited.wait_for_signal(timeout);
				if exited {
					self.join();
				} else {
					tracing::warn!(worker = %self.spec.name, ?timeout, pending = shared.mailbox.len(), "worker.shutdown.timeout");
				}
				exited
			}
		};
		tracing::debug!(worker = %self.spec.name, completed, discarded, "worker.shutdown");
		ShutdownReport {
			completed,
			timed_out: !completed,
			discarded,
		}
	}

	fn join(&self) {
		let Some(join) = self.join.lock().take() else {
			return;
		};
		if join.join().is_err() {
			tracing::error!(worker = %self.spec.name, "worker.join.failed");
		}
	}
}

impl Drop for WorkerThread {
	fn drop(&mut self) {
		if self.handle.state() != WorkerState::Stopped {
			let _ = self.shutdown(ShutdownMode::Immediate);
		}
	}
}

impl fmt::Debug for WorkerThread {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerThread").field("handle", &self.handle).finish()
	}
}

fn run_worker(handle: WorkerHandle) {
	let shared = Arc::clone(&handle.shared);
	let _ = shared.owner.set(std::thread::current().id());
	let mut ctx = WorkerContext::new(handle);

	while let Some(request) = shared.mailbox.recv() {
		if let Err(message) = request.execute(&mut ctx) {
			shared.panicked.fetch_add(1, Ordering::Relaxed);
			tracing::error!(worker = %shared.name, %message, "worker.panic");
		}
		shared.executed.fetch_add(1, Ordering::Relaxed);
	}

	// Confined values are dropped here, on their owner thread.
	drop(ctx);
	shared.set_state(WorkerState::Stopped);
	shared.exited.set_signal();
	tracing::debug!(worker = %shared.name, executed = shared.executed.load(Ordering::Relaxed), "worker.exit");
}

#[cfg(test)]
mod tests;
