//! Captured units of work and their reply channels.
//!
//! A request is a boxed closure plus an optional reply port. The reply side
//! lives behind an `Arc` shared by the caller and the queued request, so a
//! caller that gives up waiting leaves the storage valid for the worker's
//! late write.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::context::{SlotId, WorkerContext};
use crate::error::InvokeError;
use crate::signal::CompletionSignal;

type Job = Box<dyn FnOnce(&mut WorkerContext) + Send>;

/// Why a request produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Failure {
	Dropped,
	Panicked(String),
	TargetMissing(SlotId),
}

impl From<Failure> for InvokeError {
	fn from(failure: Failure) -> Self {
		match failure {
			Failure::Dropped => Self::Dropped,
			Failure::Panicked(message) => Self::Panicked { message },
			Failure::TargetMissing(slot) => Self::TargetMissing { slot },
		}
	}
}

/// Type-erased failure path into a reply slot.
trait ReplyPort: Send + Sync {
	fn fail(&self, failure: Failure);
}

/// Shared result storage plus its completion signal.
struct ResultSlot<R> {
	value: Mutex<Option<Result<R, Failure>>>,
	signal: CompletionSignal,
}

impl<R: Send> ResultSlot<R> {
	fn new() -> Self {
		Self {
			value: Mutex::new(None),
			signal: CompletionSignal::new(),
		}
	}

	/// First outcome wins. Signals either way.
	fn complete(&self, outcome: Result<R, Failure>) {
		{
			let mut value = self.value.lock();
			if value.is_none() {
				*value = Some(outcome);
			}
		}
		self.signal.set_signal();
	}
}

impl<R: Send> ReplyPort for ResultSlot<R> {
	fn fail(&self, failure: Failure) {
		self.complete(Err(failure));
	}
}

/// Caller half of a request built with [`InvocationRequest::with_reply`].
pub struct PendingReply<R> {
	slot: Arc<ResultSlot<R>>,
}

impl<R: Send> PendingReply<R> {
	/// Blocks up to `timeout` for the outcome.
	///
	/// A timeout abandons only this wait; the request still runs if queued.
	pub fn wait(self, timeout: Duration) -> Result<R, InvokeError> {
		if !self.slot.signal.wait_for_signal(timeout) {
			return Err(InvokeError::Timeout { timeout });
		}
		match self.slot.value.lock().take() {
			Some(outcome) => outcome.map_err(InvokeError::from),
			None => Err(InvokeError::Dropped),
		}
	}
}

impl<R> fmt::Debug for PendingReply<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PendingReply").finish_non_exhaustive()
	}
}

/// One captured unit of work bound for a worker queue.
pub struct InvocationRequest {
	job: Option<Job>,
	reply: Option<Arc<dyn ReplyPort>>,
}

impl InvocationRequest {
	/// Builds a fire-and-forget request.
	pub fn new<F>(op: F) -> Self
	where
		F: FnOnce(&mut WorkerContext) + Send + 'static,
	{
		Self {
			job: Some(Box::new(op)),
			reply: None,
		}
	}

	/// Builds a request whose return value is delivered to the returned
	/// [`PendingReply`].
	pub fn with_reply<F, R>(op: F) -> (Self, PendingReply<R>)
	where
		F: FnOnce(&mut WorkerContext) -> R + Send + 'static,
		R: Send + 'static,
	{
		Self::with_fallible_reply(move |ctx| Ok(op(ctx)))
	}

	pub(crate) fn with_fallible_reply<F, R>(op: F) -> (Self, PendingReply<R>)
	where
		F: FnOnce(&mut WorkerContext) -> Result<R, Failure> + Send + 'static,
		R: Send + 'static,
	{
		let slot = Arc::new(ResultSlot::new());
		let writer = Arc::clone(&slot);
		let request = Self {
			job: Some(Box::new(move |ctx| writer.complete(op(ctx)))),
			reply: Some(slot.clone() as Arc<dyn ReplyPort>),
		};
		(request, PendingReply { slot })
	}

	/// Runs the job. A panic is reported through the reply port and returned
	/// as its message; it never unwinds past this call.
	pub(crate) fn execute(mut self, ctx: &mut WorkerContext) -> Result<(), String> {
		let Some(job) = self.job.take() else {
			return Ok(());
		};
		match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| job(ctx))) {
			Ok(()) => Ok(()),
			Err(payload) => {
				let message = crate::panic_message(payload.as_ref()).unwrap_or_else(|| "<unknown panic>".to_string());
				if let Some(reply) = &self.reply {
					reply.fail(Failure::Panicked(message.clone()));
				}
				Err(message)
			}
		}
	}
}

impl Drop for InvocationRequest {
	fn drop(&mut self) {
		if self.job.is_some()
			&& let Some(reply) = &self.reply
		{
			reply.fail(Failure::Dropped);
		}
	}
}

impl fmt::Debug for InvocationRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InvocationRequest")
			.field("pending", &self.job.is_some())
			.field("reply", &self.reply.is_some())
			.finish()
	}
}
