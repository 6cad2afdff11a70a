use std::time::{Duration, Instant};

use crate::observers::{FlushObserver, FlushObservers, ObserverId};
use crate::sink::LogSink;
use crate::status::{LogStatus, StatusCallback};

/// Append-only line buffer drained by [`flush`](Self::flush).
///
/// Lives on the logger thread. Every access from elsewhere goes through the
/// worker queue, so the buffer carries no locks of its own.
pub struct LogBuffer {
	lines: Vec<String>,
	limit: Option<usize>,
	sink: LogSink,
	observers: FlushObservers,
	status: Option<StatusCallback>,
}

impl LogBuffer {
	/// Empty, unbounded buffer writing to `sink`.
	pub fn new(sink: LogSink) -> Self {
		Self {
			lines: Vec::new(),
			limit: None,
			sink,
			observers: FlushObservers::new(),
			status: None,
		}
	}

	/// Caps the number of buffered lines. Writes beyond the cap are refused.
	///
	/// # Panics
	///
	/// Panics if `limit` is zero.
	#[must_use]
	pub fn with_limit(mut self, limit: usize) -> Self {
		assert!(limit > 0, "buffer limit must be > 0");
		self.limit = Some(limit);
		self
	}

	/// Appends one line. Returns false when the buffer is full.
	pub fn write(&mut self, line: impl Into<String>) -> bool {
		if self.limit.is_some_and(|limit| self.lines.len() >= limit) {
			tracing::warn!(buffered = self.lines.len(), "logger.write.full");
			return false;
		}
		self.lines.push(line.into());
		self.notify(LogStatus::WriteSucceeded);
		true
	}

	/// Takes and clears the buffered lines, writes them to the sink, then
	/// reports the elapsed time to every flush observer.
	///
	/// Returns false if the sink failed; the taken lines are lost.
	pub fn flush(&mut self) -> bool {
		let start = Instant::now();
		let batch = std::mem::take(&mut self.lines);
		let result = self.sink.emit(&batch);
		let elapsed = start.elapsed();
		tracing::debug!(lines = batch.len(), ?elapsed, "logger.flush");

		self.observers.dispatch(elapsed);

		match result {
			Ok(()) => {
				self.notify(LogStatus::FlushSucceeded);
				true
			}
			Err(err) => {
				tracing::warn!(error = %err, lost = batch.len(), "logger.flush.failed");
				false
			}
		}
	}

	/// Drops buffered lines without writing them.
	pub fn clear(&mut self) {
		self.lines.clear();
	}

	/// Lines written since the last flush.
	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	/// Number of buffered lines.
	pub fn len(&self) -> usize {
		self.lines.len()
	}

	/// Whether nothing is buffered.
	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	/// Adds a flush observer under a fresh id.
	pub fn register_flush_observer(&mut self, observer: FlushObserver) -> ObserverId {
		self.observers.register(observer)
	}

	/// Registers under an id allocated by the caller with [`ObserverId::next`].
	pub fn insert_flush_observer(&mut self, id: ObserverId, observer: FlushObserver) {
		self.observers.insert(id, observer);
	}

	/// Removes a flush observer. Returns false if it was not registered.
	pub fn unregister_flush_observer(&mut self, id: ObserverId) -> bool {
		self.observers.unregister(id)
	}

	/// Number of registered flush observers.
	pub fn flush_observer_count(&self) -> usize {
		self.observers.len()
	}

	/// Replaces the status subscriber. `None` clears it.
	pub fn set_status_callback(&mut self, callback: Option<StatusCallback>) {
		self.status = callback;
	}

	fn notify(&mut self, status: LogStatus) {
		if let Some(callback) = self.status.as_mut() {
			callback(status);
		}
	}
}

impl Default for LogBuffer {
	fn default() -> Self {
		Self::new(LogSink::default())
	}
}

impl std::fmt::Debug for LogBuffer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LogBuffer")
			.field("lines", &self.lines.len())
			.field("sink", &self.sink)
			.field("observers", &self.observers)
			.field("status", &self.status.is_some())
			.finish()
	}
}

/// Flush duration below which a flush of a small batch is considered healthy.
pub const FLUSH_BUDGET: Duration = Duration::from_millis(10);

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::sink::MemorySink;

	fn memory_buffer() -> (LogBuffer, MemorySink) {
		let memory = MemorySink::new();
		(LogBuffer::new(LogSink::Memory(memory.clone())), memory)
	}

	#[test]
	fn flush_drains_written_lines_in_order() {
		let (mut buffer, memory) = memory_buffer();
		assert!(buffer.write("a"));
		assert!(buffer.write(String::from("b")));
		assert_eq!(buffer.len(), 2);

		assert!(buffer.flush());
		assert!(buffer.is_empty());
		assert_eq!(memory.lines(), vec!["a".to_string(), "b".to_string()]);

		assert!(buffer.flush());
		assert_eq!(memory.len(), 2);
	}

	#[test]
	fn status_callback_sees_write_then_flush() {
		let (mut buffer, _memory) = memory_buffer();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		buffer.set_status_callback(Some(Box::new(move |status: LogStatus| sink.lock().push(status))));

		buffer.write("X");
		buffer.flush();
		buffer.set_status_callback(None);
		buffer.write("Y");

		assert_eq!(*seen.lock(), vec![LogStatus::WriteSucceeded, LogStatus::FlushSucceeded]);
	}

	#[test]
	fn status_callback_is_single_slot() {
		let (mut buffer, _memory) = memory_buffer();
		let first = Arc::new(Mutex::new(0));
		let second = Arc::new(Mutex::new(0));
		let a = Arc::clone(&first);
		let b = Arc::clone(&second);
		buffer.set_status_callback(Some(Box::new(move |_| *a.lock() += 1)));
		buffer.set_status_callback(Some(Box::new(move |_| *b.lock() += 1)));
		buffer.write("x");

		assert_eq!(*first.lock(), 0);
		assert_eq!(*second.lock(), 1);
	}

	#[test]
	fn flush_reports_duration_to_observers() {
		let (mut buffer, _memory) = memory_buffer();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let id = buffer.register_flush_observer(Arc::new(move |d: Duration| sink.lock().push(d)));

		for _ in 0..100 {
			buffer.write("Flush Timer String");
		}
		buffer.flush();
		assert!(buffer.unregister_flush_observer(id));
		buffer.flush();

		let seen = seen.lock();
		assert_eq!(seen.len(), 1);
		assert!(seen[0] <= FLUSH_BUDGET, "flush took {:?}", seen[0]);
	}

	#[test]
	fn limit_refuses_overflow_without_status() {
		let (buffer, _memory) = memory_buffer();
		let mut buffer = buffer.with_limit(1);
		let count = Arc::new(Mutex::new(0));
		let c = Arc::clone(&count);
		buffer.set_status_callback(Some(Box::new(move |_| *c.lock() += 1)));

		assert!(buffer.write("a"));
		assert!(!buffer.write("b"));
		assert_eq!(buffer.lines(), ["a".to_string()]);
		assert_eq!(*count.lock(), 1);
	}

	#[test]
	fn failed_flush_skips_status_but_still_reports_duration() {
		let dir = tempfile::tempdir().unwrap();
		let mut buffer = LogBuffer::new(LogSink::File(dir.path().join("missing").join("log.txt")));
		let statuses = Arc::new(Mutex::new(Vec::new()));
		let durations = Arc::new(Mutex::new(0));
		let s = Arc::clone(&statuses);
		let d = Arc::clone(&durations);
		buffer.set_status_callback(Some(Box::new(move |status: LogStatus| s.lock().push(status))));
		buffer.register_flush_observer(Arc::new(move |_| *d.lock() += 1));

		buffer.write("lost");
		assert!(!buffer.flush());
		assert!(buffer.is_empty());
		assert_eq!(*statuses.lock(), vec![LogStatus::WriteSucceeded]);
		assert_eq!(*durations.lock(), 1);
	}
}
