//! Error types for the logger.

use thiserror::Error;

/// Errors raised while bringing up the process-wide logger.
#[derive(Debug, Error)]
pub enum LoggerError {
	/// `Logger::init` was called after the logger was configured or built.
	#[error("logger already initialized")]
	AlreadyInitialized,

	/// The logger thread could not be started.
	#[error(transparent)]
	Worker(#[from] tether_worker::WorkerError),

	/// The buffer could not be placed on the logger thread.
	#[error(transparent)]
	Enqueue(#[from] tether_worker::EnqueueError),
}

/// Result type for logger setup.
pub type Result<T> = std::result::Result<T, LoggerError>;
