use std::future::Future;
use std::sync::OnceLock;

/// Name of the thread that drives timer deadlines.
pub const TIMER_THREAD_NAME: &str = "tether-timer";

fn clock_runtime() -> &'static tokio::runtime::Runtime {
	static CLOCK_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	CLOCK_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_time()
			.worker_threads(1)
			.thread_name(TIMER_THREAD_NAME)
			.build()
			.expect("failed to build tether timer runtime")
	})
}

/// Spawns a deadline task on the shared timer clock.
///
/// Only timer bookkeeping runs here. Bound operations are always handed to
/// their worker's queue.
pub(crate) fn spawn_clock_task<F>(fut: F)
where
	F: Future<Output = ()> + Send + 'static,
{
	tracing::trace!("timer.spawn");
	clock_runtime().spawn(fut);
}
