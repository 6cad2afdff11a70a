use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use pretty_assertions::assert_eq;

use super::*;
use crate::Confined;

fn spawn_worker(name: &str) -> WorkerThread {
	WorkerThread::spawn(WorkerSpec::new(name)).expect("worker should start")
}

#[test]
fn enqueue_before_start_reports_not_running() {
	let worker = WorkerThread::new(WorkerSpec::new("idle"));
	let err = worker.handle().post(|_| {}).unwrap_err();
	assert_eq!(err, EnqueueError::NotRunning { worker: "idle".into() });
	assert_eq!(worker.handle().state(), WorkerState::Idle);
}

#[test]
fn enqueue_after_shutdown_reports_closed() {
	let worker = spawn_worker("closed");
	let handle = worker.handle();
	let report = worker.shutdown(ShutdownMode::Graceful {
		timeout: Duration::from_secs(1),
	});
	assert!(report.completed());
	assert_eq!(handle.state(), WorkerState::Stopped);

	let err = handle.invoke(Duration::from_millis(50), |_| ()).unwrap_err();
	assert_eq!(err, InvokeError::Enqueue(EnqueueError::Closed { worker: "closed".into() }));
}

#[test]
fn start_twice_is_rejected() {
	let worker = spawn_worker("twice");
	assert!(matches!(worker.start(), Err(WorkerError::AlreadyStarted { .. })));
}

#[test]
fn invoke_runs_on_worker_thread() {
	let worker = spawn_worker("named-worker");
	let handle = worker.handle();
	let name = handle
		.invoke(Duration::from_secs(1), |_| thread::current().name().map(str::to_owned))
		.unwrap();
	assert_eq!(name.as_deref(), Some("named-worker"));
	assert!(!handle.is_current());
}

#[test]
fn single_producer_order_is_preserved() {
	let worker = spawn_worker("fifo");
	let target = Confined::install(&worker.handle(), Vec::<u32>::new).unwrap();
	for i in 0..100 {
		target.post(move |v| v.push(i)).unwrap();
	}
	let seen = target.invoke(Duration::from_secs(1), |v| v.clone()).unwrap();
	assert_eq!(seen, (0..100).collect::<Vec<_>>());
}

#[test]
fn many_producers_execute_serially() {
	let worker = spawn_worker("serial");
	let target = Confined::install(&worker.handle(), Vec::<(usize, usize)>::new).unwrap();
	let in_flight = Arc::new(AtomicUsize::new(0));
	let overlap = Arc::new(AtomicUsize::new(0));

	let producers: Vec<_> = (0..8)
		.map(|producer| {
			let target = target.clone();
			let in_flight = Arc::clone(&in_flight);
			let overlap = Arc::clone(&overlap);
			thread::spawn(move || {
				for seq in 0..100 {
					let in_flight = Arc::clone(&in_flight);
					let overlap = Arc::clone(&overlap);
					let ok = target
						.invoke(Duration::from_secs(5), move |v| {
							if in_flight.fetch_add(1, Ordering::SeqCst) != 0 {
								overlap.fetch_add(1, Ordering::SeqCst);
							}
							v.push((producer, seq));
							in_flight.fetch_sub(1, Ordering::SeqCst);
							true
						})
						.unwrap();
					assert!(ok);
				}
			})
		})
		.collect();
	for producer in producers {
		producer.join().unwrap();
	}

	let seen = target.invoke(Duration::from_secs(1), |v| v.clone()).unwrap();
	assert_eq!(seen.len(), 800);
	assert_eq!(overlap.load(Ordering::SeqCst), 0);
	for producer in 0..8 {
		let order: Vec<_> = seen.iter().filter(|(p, _)| *p == producer).map(|(_, s)| *s).collect();
		assert_eq!(order, (0..100).collect::<Vec<_>>());
	}
}

#[test]
fn timeout_abandons_wait_but_request_still_runs() {
	let worker = spawn_worker("slow");
	let target = Confined::install(&worker.handle(), || 0u32).unwrap();
	target.post(|_| thread::sleep(Duration::from_millis(150))).unwrap();

	let start = Instant::now();
	let err = target
		.invoke(Duration::from_millis(20), |n| {
			*n += 1;
			*n
		})
		.unwrap_err();
	let waited = start.elapsed();
	assert!(err.is_timeout());
	assert!(waited < Duration::from_millis(120), "caller waited {waited:?}");

	// The abandoned request still executes afterwards.
	let after = target.invoke(Duration::from_secs(2), |n| *n).unwrap();
	assert_eq!(after, 1);
}

#[test]
fn panic_is_reported_and_worker_survives() {
	let worker = spawn_worker("panicky");
	let handle = worker.handle();
	let err = handle.invoke(Duration::from_secs(1), |_| -> u32 { panic!("kaboom") }).unwrap_err();
	assert!(matches!(&err, InvokeError::Panicked { message } if message.contains("kaboom")), "got {err:?}");

	assert_eq!(handle.invoke(Duration::from_secs(1), |_| 7).unwrap(), 7);
	assert_eq!(handle.stats().panicked, 1);
}

#[test]
fn immediate_shutdown_drops_pending_requests() {
	let worker = spawn_worker("immediate");
	let handle = worker.handle();
	let gate = Arc::new(CompletionSignal::new());
	let entered = Arc::new(CompletionSignal::new());
	{
		let gate = Arc::clone(&gate);
		let entered = Arc::clone(&entered);
		handle
			.post(move |_| {
				entered.set_signal();
				gate.wait_for_signal(Duration::from_secs(5));
			})
			.unwrap();
	}
	assert!(entered.wait_for_signal(Duration::from_secs(1)));

	let mut replies = Vec::new();
	for i in 0..3u32 {
		let (request, reply) = InvocationRequest::with_reply(move |_| i);
		handle.enqueue(request).unwrap();
		replies.push(reply);
	}

	let releaser = {
		let gate = Arc::clone(&gate);
		thread::spawn(move || {
			thread::sleep(Duration::from_millis(20));
			gate.set_signal();
		})
	};
	let report = worker.shutdown(ShutdownMode::Immediate);
	releaser.join().unwrap();

	assert!(report.completed());
	assert_eq!(report.discarded(), 3);
	for reply in replies {
		assert_eq!(reply.wait(Duration::from_millis(50)), Err(InvokeError::Dropped));
	}
}

#[test]
fn graceful_shutdown_runs_queued_work() {
	let worker = spawn_worker("graceful");
	let count = Arc::new(AtomicUsize::new(0));
	for _ in 0..20 {
		let count = Arc::clone(&count);
		worker
			.handle()
			.post(move |_| {
				count.fetch_add(1, Ordering::SeqCst);
			})
			.unwrap();
	}
	let report = worker.shutdown(ShutdownMode::Graceful {
		timeout: Duration::from_secs(2),
	});
	assert!(report.completed());
	assert_eq!(count.load(Ordering::SeqCst), 20);
	assert_eq!(worker.handle().stats().executed, 20);
}

#[test]
fn blocking_self_invoke_is_refused() {
	let worker = spawn_worker("reentrant");
	let handle = worker.handle();
	let err = handle
		.invoke(Duration::from_secs(1), |ctx| {
			let me = ctx.worker().clone();
			me.invoke(Duration::from_secs(1), |_| ()).unwrap_err()
		})
		.unwrap();
	assert_eq!(err, InvokeError::WouldDeadlock { worker: "reentrant".into() });
}

#[test]
fn removed_target_reports_missing() {
	let worker = spawn_worker("removed");
	let target = Confined::install(&worker.handle(), String::new).unwrap();
	target.remove().unwrap();
	let err = target.invoke(Duration::from_secs(1), |s| s.len()).unwrap_err();
	assert_eq!(err, InvokeError::TargetMissing { slot: target.slot() });
}

#[test]
fn confined_values_need_not_be_send() {
	use std::rc::Rc;

	let worker = spawn_worker("not-send");
	let target = Confined::install(&worker.handle(), || Rc::new(5u32)).unwrap();
	let n = target.invoke(Duration::from_secs(1), |rc| **rc + Rc::strong_count(rc) as u32).unwrap();
	assert_eq!(n, 6);
}

#[test]
fn stats_track_submissions() {
	let worker = spawn_worker("stats");
	let handle = worker.handle();
	for _ in 0..5 {
		handle.post(|_| {}).unwrap();
	}
	handle.invoke(Duration::from_secs(1), |_| ()).unwrap();
	let stats = handle.stats();
	assert_eq!(stats.name, "stats");
	assert_eq!(stats.state, WorkerState::Running);
	assert_eq!(stats.submitted, 6);
	assert!(stats.executed >= 5);
}
