use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;

static NEXT_OBSERVER: AtomicU64 = AtomicU64::new(1);

/// Identifies one registered flush observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
	/// Allocates a process-unique id. Ids are handed out before registration
	/// reaches the logger thread, so callers can unregister without waiting.
	pub fn next() -> Self {
		Self(NEXT_OBSERVER.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for ObserverId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "observer#{}", self.0)
	}
}

/// Callback receiving the measured flush duration.
pub type FlushObserver = Arc<dyn Fn(Duration) + Send + Sync>;

/// Multicast registry of flush observers, dispatched in registration order.
#[derive(Default)]
pub struct FlushObservers {
	entries: IndexMap<ObserverId, FlushObserver>,
}

impl FlushObservers {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `observer` under a fresh id.
	pub fn register(&mut self, observer: FlushObserver) -> ObserverId {
		let id = ObserverId::next();
		self.insert(id, observer);
		id
	}

	/// Registers `observer` under a caller-chosen id. An existing entry with
	/// the same id is replaced in place.
	pub fn insert(&mut self, id: ObserverId, observer: FlushObserver) {
		self.entries.insert(id, observer);
	}

	/// Removes one observer. Returns false if it was not registered.
	pub fn unregister(&mut self, id: ObserverId) -> bool {
		self.entries.shift_remove(&id).is_some()
	}

	/// Number of registered observers.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether no observer is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Point-in-time copy of the registered callbacks.
	pub fn snapshot(&self) -> Vec<FlushObserver> {
		self.entries.values().cloned().collect()
	}

	/// Calls every observer from a snapshot, so registry changes made while
	/// dispatching apply to the next dispatch.
	pub fn dispatch(&self, elapsed: Duration) {
		for observer in self.snapshot() {
			observer(elapsed);
		}
	}
}

impl fmt::Debug for FlushObservers {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.entries.keys()).finish()
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;
	use pretty_assertions::assert_eq;

	use super::*;

	fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> FlushObserver {
		let log = Arc::clone(log);
		Arc::new(move |_| log.lock().push(tag))
	}

	#[test]
	fn dispatches_in_registration_order() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let mut observers = FlushObservers::new();
		observers.register(recorder(&log, "a"));
		let b = observers.register(recorder(&log, "b"));
		observers.register(recorder(&log, "c"));

		observers.dispatch(Duration::ZERO);
		assert!(observers.unregister(b));
		observers.dispatch(Duration::ZERO);

		assert_eq!(*log.lock(), vec!["a", "b", "c", "a", "c"]);
	}

	#[test]
	fn unregister_unknown_is_false() {
		let mut observers = FlushObservers::new();
		assert!(!observers.unregister(ObserverId::next()));
	}

	#[test]
	fn snapshot_is_detached_from_registry() {
		let log = Arc::new(Mutex::new(Vec::new()));
		let mut observers = FlushObservers::new();
		let a = observers.register(recorder(&log, "a"));
		let snapshot = observers.snapshot();
		observers.unregister(a);

		for observer in snapshot {
			observer(Duration::from_millis(1));
		}
		assert_eq!(*log.lock(), vec!["a"]);
		assert!(observers.is_empty());
	}

	#[test]
	fn observers_receive_duration() {
		let seen = Arc::new(Mutex::new(None));
		let mut observers = FlushObservers::new();
		let sink = Arc::clone(&seen);
		observers.register(Arc::new(move |d: Duration| *sink.lock() = Some(d)));
		observers.dispatch(Duration::from_millis(3));
		assert_eq!(*seen.lock(), Some(Duration::from_millis(3)));
	}
}
