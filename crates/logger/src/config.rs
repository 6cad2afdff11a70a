use std::time::Duration;

use crate::sink::LogSink;

/// Settings for the process-wide logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
	pub(crate) thread_name: String,
	pub(crate) flush_delay: Duration,
	pub(crate) invoke_timeout: Duration,
	pub(crate) buffer_limit: Option<usize>,
	pub(crate) sink: LogSink,
}

impl LoggerConfig {
	/// Name of the logger's worker thread.
	#[must_use]
	pub fn thread_name(mut self, name: impl Into<String>) -> Self {
		self.thread_name = name.into();
		self
	}

	/// Delay between a write and the automatic flush it schedules.
	#[must_use]
	pub fn flush_delay(mut self, delay: Duration) -> Self {
		self.flush_delay = delay;
		self
	}

	/// Upper bound on blocking calls made by the logger's own API.
	#[must_use]
	pub fn invoke_timeout(mut self, timeout: Duration) -> Self {
		self.invoke_timeout = timeout;
		self
	}

	/// Caps buffered lines between flushes.
	///
	/// # Panics
	///
	/// Panics if `limit` is zero.
	#[must_use]
	pub fn buffer_limit(mut self, limit: usize) -> Self {
		assert!(limit > 0, "buffer limit must be > 0");
		self.buffer_limit = Some(limit);
		self
	}

	/// Where flushed lines go.
	#[must_use]
	pub fn sink(mut self, sink: LogSink) -> Self {
		self.sink = sink;
		self
	}
}

impl Default for LoggerConfig {
	fn default() -> Self {
		Self {
			thread_name: "LoggerThread".into(),
			flush_delay: Duration::from_millis(250),
			invoke_timeout: Duration::from_millis(500),
			buffer_limit: None,
			sink: LogSink::Stdout,
		}
	}
}
