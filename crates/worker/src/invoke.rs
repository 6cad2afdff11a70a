//! Free-function entry points for cross-thread invocation.
//!
//! `async_invoke` reports only presence of a result; `try_invoke` keeps the
//! failure kind.

use std::time::Duration;

use crate::confined::Confined;
use crate::error::{EnqueueError, InvokeError};
use crate::thread::WorkerHandle;

/// Runs `op` on the thread owning `target`, blocking up to `timeout`.
///
/// Returns `None` if the owner is not running, the wait timed out, or the
/// operation did not complete.
pub fn async_invoke<T, F, R>(target: &Confined<T>, timeout: Duration, op: F) -> Option<R>
where
	T: 'static,
	F: FnOnce(&mut T) -> R + Send + 'static,
	R: Send + 'static,
{
	match target.invoke(timeout, op) {
		Ok(value) => Some(value),
		Err(err) => {
			tracing::debug!(worker = %target.worker().name(), error = %err, "invoke.failed");
			None
		}
	}
}

/// Like [`async_invoke`], keeping the failure kind.
pub fn try_invoke<T, F, R>(target: &Confined<T>, timeout: Duration, op: F) -> Result<R, InvokeError>
where
	T: 'static,
	F: FnOnce(&mut T) -> R + Send + 'static,
	R: Send + 'static,
{
	target.invoke(timeout, op)
}

/// Fire-and-forget variant of [`async_invoke`].
pub fn async_post<T, F>(target: &Confined<T>, op: F) -> Result<(), EnqueueError>
where
	T: 'static,
	F: FnOnce(&mut T) + Send + 'static,
{
	target.post(op)
}

/// Runs a free-standing closure on `worker`, blocking up to `timeout`.
pub fn invoke_on<F, R>(worker: &WorkerHandle, timeout: Duration, op: F) -> Result<R, InvokeError>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	worker.invoke(timeout, move |_| op())
}

/// Runs a free-standing closure on `worker` without waiting.
pub fn post_on<F>(worker: &WorkerHandle, op: F) -> Result<(), EnqueueError>
where
	F: FnOnce() + Send + 'static,
{
	worker.post(move |_| op())
}
