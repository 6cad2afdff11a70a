//! Error kinds surfaced to callers of the invocation runtime.

use std::time::Duration;

use thiserror::Error;

use crate::context::SlotId;

/// The owner thread cannot accept work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnqueueError {
	/// The worker exists but was never started.
	#[error("worker `{worker}` is not running")]
	NotRunning { worker: String },
	/// The worker has shut down.
	#[error("worker `{worker}` is closed")]
	Closed { worker: String },
}

/// Failure of a blocking cross-thread invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
	/// The request never reached the queue.
	#[error(transparent)]
	Enqueue(#[from] EnqueueError),
	/// The caller stopped waiting. The request may still run later.
	#[error("no completion within {timeout:?}")]
	Timeout { timeout: Duration },
	/// The request was discarded before it ran.
	#[error("request dropped before execution")]
	Dropped,
	/// The operation panicked on the owner thread.
	#[error("operation panicked: {message}")]
	Panicked { message: String },
	/// The confined target no longer exists on the owner thread.
	#[error("confined target {slot} is gone")]
	TargetMissing { slot: SlotId },
	/// A blocking call from the owner thread onto its own queue.
	#[error("blocking invoke from worker `{worker}` onto itself")]
	WouldDeadlock { worker: String },
}

impl InvokeError {
	/// Returns true when only the caller's wait was abandoned.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}

/// Failure to bring a worker thread up.
#[derive(Debug, Error)]
pub enum WorkerError {
	#[error("failed to spawn worker thread: {0}")]
	Spawn(#[from] std::io::Error),
	#[error("worker `{worker}` was already started")]
	AlreadyStarted { worker: String },
}
