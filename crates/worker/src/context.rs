use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::thread::WorkerHandle;

static NEXT_SLOT: AtomicU64 = AtomicU64::new(1);

/// Identifies one confined value inside a [`WorkerContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
	/// Allocates a process-unique slot id.
	pub(crate) fn next() -> Self {
		Self(NEXT_SLOT.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for SlotId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// State owned by a worker's execution thread.
///
/// Built on the worker thread and never handed to another thread. Values
/// stored here are only reachable from requests the worker executes, which
/// run one at a time, so they need no locking.
pub struct WorkerContext {
	worker: WorkerHandle,
	slots: HashMap<SlotId, Box<dyn Any>>,
}

impl WorkerContext {
	pub(crate) fn new(worker: WorkerHandle) -> Self {
		Self {
			worker,
			slots: HashMap::new(),
		}
	}

	/// Handle of the worker this context belongs to.
	pub fn worker(&self) -> &WorkerHandle {
		&self.worker
	}

	pub(crate) fn insert(&mut self, id: SlotId, value: Box<dyn Any>) {
		if self.slots.insert(id, value).is_some() {
			tracing::warn!(worker = %self.worker.name(), slot = %id, "worker.slot.replaced");
		}
	}

	/// Borrows a confined value, if present and of type `T`.
	pub fn get_mut<T: 'static>(&mut self, id: SlotId) -> Option<&mut T> {
		self.slots.get_mut(&id).and_then(|slot| slot.downcast_mut::<T>())
	}

	pub(crate) fn remove(&mut self, id: SlotId) -> bool {
		self.slots.remove(&id).is_some()
	}

	/// Number of confined values.
	pub fn len(&self) -> usize {
		self.slots.len()
	}

	/// Whether no value is confined here.
	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}
}

impl fmt::Debug for WorkerContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerContext")
			.field("worker", &self.worker.name())
			.field("slots", &self.slots.len())
			.finish()
	}
}
