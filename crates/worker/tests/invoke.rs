use std::thread;
use std::time::{Duration, Instant};

use tether_worker::{Confined, EnqueueError, InvokeError, WorkerSpec, WorkerThread, async_invoke, async_post, invoke_on, post_on, try_invoke};

#[derive(Default)]
struct Counter {
	hits: u64,
}

impl Counter {
	fn hit(&mut self, by: u64) -> u64 {
		self.hits += by;
		self.hits
	}
}

#[test]
fn async_invoke_returns_operation_value() {
	let worker = WorkerThread::spawn(WorkerSpec::new("invoke-value")).unwrap();
	let counter = Confined::install(&worker.handle(), Counter::default).unwrap();

	assert_eq!(async_invoke(&counter, Duration::from_millis(100), |c| c.hit(2)), Some(2));
	assert_eq!(async_invoke(&counter, Duration::from_millis(100), |c| c.hit(3)), Some(5));
}

#[test]
fn async_invoke_is_empty_when_owner_not_running() {
	let worker = WorkerThread::new(WorkerSpec::new("invoke-idle"));
	let err = Confined::install(&worker.handle(), Counter::default).unwrap_err();
	assert_eq!(err, EnqueueError::NotRunning { worker: "invoke-idle".into() });

	let start = Instant::now();
	let result = invoke_on(&worker.handle(), Duration::from_secs(5), || 1);
	assert!(start.elapsed() < Duration::from_millis(100), "enqueue failure must not wait");
	assert!(matches!(result, Err(InvokeError::Enqueue(EnqueueError::NotRunning { .. }))));
}

#[test]
fn async_invoke_respects_timeout_under_load() {
	let worker = WorkerThread::spawn(WorkerSpec::new("invoke-load")).unwrap();
	let counter = Confined::install(&worker.handle(), Counter::default).unwrap();
	for _ in 0..5 {
		async_post(&counter, |_| thread::sleep(Duration::from_millis(50))).unwrap();
	}

	let start = Instant::now();
	assert_eq!(async_invoke(&counter, Duration::from_millis(30), |c| c.hit(1)), None);
	assert!(start.elapsed() < Duration::from_millis(150));

	let err = try_invoke(&counter, Duration::from_millis(10), |c| c.hit(1)).unwrap_err();
	assert!(err.is_timeout());

	// Both abandoned hits still land.
	assert_eq!(try_invoke(&counter, Duration::from_secs(2), |c| c.hits), Ok(2));
}

#[test]
fn free_closures_run_on_worker() {
	let worker = WorkerThread::spawn(WorkerSpec::new("invoke-free")).unwrap();
	let (tx, rx) = std::sync::mpsc::channel();
	post_on(&worker.handle(), move || tx.send(thread::current().name().map(str::to_owned)).unwrap()).unwrap();
	assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap().as_deref(), Some("invoke-free"));

	let doubled = invoke_on(&worker.handle(), Duration::from_secs(1), || 21 * 2).unwrap();
	assert_eq!(doubled, 42);
}
