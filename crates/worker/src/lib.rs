//! Thread-confined execution and cross-thread invocation.
//!
//! A [`WorkerThread`] owns a FIFO queue and one OS thread that runs queued
//! [`InvocationRequest`]s strictly one after another. Values placed on a
//! worker through [`Confined`] are only ever touched by that thread; other
//! threads reach them by submitting closures, either blocking with a timeout
//! or fire-and-forget. [`Timer`] schedules a delayed submission onto a worker.

mod confined;
mod context;
mod error;
mod invoke;
mod mailbox;
mod panic;
mod request;
mod signal;
mod spawn;
mod thread;
mod timer;
mod token;

pub use confined::Confined;
pub use context::{SlotId, WorkerContext};
pub use error::{EnqueueError, InvokeError, WorkerError};
pub use invoke::{async_invoke, async_post, invoke_on, post_on, try_invoke};
pub use panic::panic_message;
pub use request::{InvocationRequest, PendingReply};
pub use signal::CompletionSignal;
pub use spawn::TIMER_THREAD_NAME;
pub use thread::{ShutdownMode, ShutdownReport, WorkerHandle, WorkerSpec, WorkerState, WorkerStats, WorkerThread};
pub use timer::{Timer, TimerState};
