//! Thread-confined log buffer behind a process-wide logger.
//!
//! [`LogBuffer`] lives on the logger's worker thread and is reached only
//! through cross-thread invocation. [`Logger::instance`] builds the logger on
//! first use.

mod buffer;
mod config;
mod error;
mod logger;
mod observers;
mod sink;
mod status;

pub use buffer::{FLUSH_BUDGET, LogBuffer};
pub use config::LoggerConfig;
pub use error::{LoggerError, Result};
pub use logger::Logger;
pub use observers::{FlushObserver, FlushObservers, ObserverId};
pub use sink::{LogSink, MemorySink};
pub use status::{LogStatus, StatusCallback};
