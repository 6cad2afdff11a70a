use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tether_worker::{Confined, EnqueueError, InvokeError, ShutdownMode, ShutdownReport, Timer, WorkerHandle, WorkerSpec, WorkerThread};

use crate::buffer::LogBuffer;
use crate::config::LoggerConfig;
use crate::error::{LoggerError, Result};
use crate::observers::{FlushObserver, ObserverId};
use crate::status::StatusCallback;

static CONFIG: OnceLock<LoggerConfig> = OnceLock::new();
static INSTANCE: OnceLock<Logger> = OnceLock::new();

/// Process-wide logger.
///
/// Owns a dedicated worker thread and the [`LogBuffer`] confined to it. Each
/// [`write`](Self::write) arms a one-shot flush timer, so buffered lines reach
/// the sink `flush_delay` after the first unflushed write.
pub struct Logger {
	config: LoggerConfig,
	worker: WorkerThread,
	buffer: Confined<LogBuffer>,
	flush_timer: Timer,
}

impl Logger {
	/// Installs the configuration used when the logger is first built.
	///
	/// Fails once the configuration is fixed, either by an earlier `init` or by
	/// the first [`instance`](Self::instance) call.
	pub fn init(config: LoggerConfig) -> Result<()> {
		CONFIG.set(config).map_err(|_| LoggerError::AlreadyInitialized)
	}

	/// Returns the logger, building it on first access.
	///
	/// # Panics
	///
	/// Panics if the logger thread cannot be spawned.
	pub fn instance() -> &'static Logger {
		INSTANCE.get_or_init(|| {
			let config = CONFIG.get_or_init(LoggerConfig::default).clone();
			Self::start(config).expect("failed to start logger thread")
		})
	}

	pub(crate) fn start(config: LoggerConfig) -> Result<Self> {
		let worker = WorkerThread::spawn(WorkerSpec::new(config.thread_name.clone()))?;
		let sink = config.sink.clone();
		let limit = config.buffer_limit;
		let buffer = Confined::install(&worker.handle(), move || {
			let buffer = LogBuffer::new(sink);
			match limit {
				Some(limit) => buffer.with_limit(limit),
				None => buffer,
			}
		})?;
		let flush_timer = Timer::for_target(&buffer, |buffer: &mut LogBuffer| {
			if !buffer.is_empty() {
				buffer.flush();
			}
		});
		tracing::debug!(thread = %config.thread_name, flush_delay = ?config.flush_delay, "logger.start");

		Ok(Self {
			config,
			worker,
			buffer,
			flush_timer,
		})
	}

	/// Queues one line and schedules a flush if none is pending.
	pub fn write(&self, line: impl Into<String>) -> std::result::Result<(), EnqueueError> {
		let line = line.into();
		self.buffer.post(move |buffer| {
			buffer.write(line);
		})?;
		self.flush_timer.start_unless_armed(self.config.flush_delay);
		Ok(())
	}

	/// Flushes now and waits for the outcome. A pending automatic flush is
	/// cancelled.
	pub fn flush(&self) -> std::result::Result<bool, InvokeError> {
		self.flush_timer.stop();
		self.buffer.invoke(self.config.invoke_timeout, LogBuffer::flush)
	}

	/// Replaces the status subscriber. `None` clears it.
	pub fn set_status_callback(&self, callback: Option<StatusCallback>) -> std::result::Result<(), EnqueueError> {
		self.buffer.post(move |buffer| buffer.set_status_callback(callback))
	}

	/// Adds a flush observer. The id is valid immediately; registration takes
	/// effect before any later request from this thread.
	pub fn register_flush_observer<F>(&self, observer: F) -> std::result::Result<ObserverId, EnqueueError>
	where
		F: Fn(Duration) + Send + Sync + 'static,
	{
		let id = ObserverId::next();
		let observer: FlushObserver = Arc::new(observer);
		self.buffer.post(move |buffer| buffer.insert_flush_observer(id, observer))?;
		Ok(id)
	}

	/// Removes a flush observer. Safe to call from inside an observer; the
	/// removal applies from the next flush.
	pub fn unregister_flush_observer(&self, id: ObserverId) -> std::result::Result<(), EnqueueError> {
		self.buffer.post(move |buffer| {
			if !buffer.unregister_flush_observer(id) {
				tracing::trace!(%id, "logger.observer.unknown");
			}
		})
	}

	/// The confined buffer, for direct cross-thread invocation.
	pub fn buffer(&self) -> &Confined<LogBuffer> {
		&self.buffer
	}

	/// Handle of the logger thread.
	pub fn worker(&self) -> WorkerHandle {
		self.worker.handle()
	}

	/// Cancels the pending flush, flushes what is buffered, and stops the
	/// logger thread. Later calls fail with [`EnqueueError::Closed`].
	pub fn shutdown(&self) -> ShutdownReport {
		self.flush_timer.stop();
		if let Err(err) = self.buffer.post(|buffer| {
			buffer.flush();
		}) {
			tracing::debug!(error = %err, "logger.shutdown.flush_skipped");
		}
		self.worker.shutdown(ShutdownMode::Graceful {
			timeout: self.config.invoke_timeout,
		})
	}
}

impl std::fmt::Debug for Logger {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Logger")
			.field("worker", &self.worker.handle())
			.field("flush_timer", &self.flush_timer)
			.finish()
	}
}
