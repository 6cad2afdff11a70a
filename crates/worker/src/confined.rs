use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::context::SlotId;
use crate::error::{EnqueueError, InvokeError};
use crate::request::{Failure, InvocationRequest};
use crate::thread::WorkerHandle;

/// Handle to a value that lives on one worker thread.
///
/// The value is built on the owner thread and only ever touched by requests
/// that thread executes. The handle itself is cheap to clone and may be used
/// from any thread.
pub struct Confined<T> {
	worker: WorkerHandle,
	slot: SlotId,
	_marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Confined<T> {
	fn clone(&self) -> Self {
		Self {
			worker: self.worker.clone(),
			slot: self.slot,
			_marker: PhantomData,
		}
	}
}

impl<T: 'static> Confined<T> {
	/// Queues construction of a value on `worker`.
	///
	/// Requests submitted afterwards from the same thread observe the value,
	/// since the queue preserves per-producer order.
	pub fn install<F>(worker: &WorkerHandle, factory: F) -> Result<Self, EnqueueError>
	where
		F: FnOnce() -> T + Send + 'static,
	{
		let slot = SlotId::next();
		worker.post(move |ctx| ctx.insert(slot, Box::new(factory())))?;
		tracing::trace!(worker = %worker.name(), slot = %slot, ty = std::any::type_name::<T>(), "worker.slot.install");
		Ok(Self {
			worker: worker.clone(),
			slot,
			_marker: PhantomData,
		})
	}

	/// Worker that owns the value.
	pub fn worker(&self) -> &WorkerHandle {
		&self.worker
	}

	/// Slot holding the value in the owner's context.
	pub fn slot(&self) -> SlotId {
		self.slot
	}

	/// Runs `op` against the value on its owner thread and waits up to
	/// `timeout` for the result.
	///
	/// On [`InvokeError::Timeout`] the operation has not been cancelled and
	/// will still run.
	pub fn invoke<F, R>(&self, timeout: Duration, op: F) -> Result<R, InvokeError>
	where
		F: FnOnce(&mut T) -> R + Send + 'static,
		R: Send + 'static,
	{
		self.worker.guard_reentry()?;
		let slot = self.slot;
		let (request, reply) = InvocationRequest::with_fallible_reply(move |ctx| match ctx.get_mut::<T>(slot) {
			Some(target) => Ok(op(target)),
			None => Err(Failure::TargetMissing(slot)),
		});
		self.worker.enqueue(request)?;
		reply.wait(timeout)
	}

	/// Runs `op` against the value without waiting.
	pub fn post<F>(&self, op: F) -> Result<(), EnqueueError>
	where
		F: FnOnce(&mut T) + Send + 'static,
	{
		let slot = self.slot;
		self.worker.post(move |ctx| match ctx.get_mut::<T>(slot) {
			Some(target) => op(target),
			None => tracing::warn!(worker = %ctx.worker().name(), slot = %slot, "worker.slot.missing"),
		})
	}

	/// Queues removal of the value. It is dropped on the owner thread.
	pub fn remove(&self) -> Result<(), EnqueueError> {
		let slot = self.slot;
		self.worker.post(move |ctx| {
			ctx.remove(slot);
		})
	}
}

impl<T> fmt::Debug for Confined<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Confined")
			.field("worker", &self.worker.name())
			.field("slot", &self.slot)
			.field("type", &std::any::type_name::<T>())
			.finish()
	}
}
