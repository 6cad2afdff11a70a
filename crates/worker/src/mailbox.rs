use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// Lifecycle of the mailbox as seen by senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
	/// Not yet opened; sends are refused.
	Pending,
	Open,
	/// Closed; receivers drain what is queued, then see `None`.
	Closed,
}

/// Mailbox send error. The rejected message is handed back.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum MailboxSendError<T> {
	/// Mailbox has not been opened yet.
	NotOpen(T),
	/// Mailbox is closed.
	Closed(T),
}

struct MailboxState<T> {
	queue: VecDeque<T>,
	gate: Gate,
}

/// Unbounded multi-producer, single-consumer FIFO with a blocking receive.
pub(crate) struct Mailbox<T> {
	state: Mutex<MailboxState<T>>,
	notify_recv: Condvar,
}

impl<T> Mailbox<T> {
	/// Creates a mailbox in the pending state.
	pub fn new() -> Self {
		Self {
			state: Mutex::new(MailboxState {
				queue: VecDeque::new(),
				gate: Gate::Pending,
			}),
			notify_recv: Condvar::new(),
		}
	}

	/// Starts accepting messages. Returns false if the mailbox was closed.
	pub fn open(&self) -> bool {
		let mut state = self.state.lock();
		match state.gate {
			Gate::Closed => false,
			_ => {
				state.gate = Gate::Open;
				true
			}
		}
	}

	/// Appends one message and wakes the receiver. Returns the queue depth
	/// after the push.
	pub fn send(&self, msg: T) -> Result<usize, MailboxSendError<T>> {
		let mut state = self.state.lock();
		match state.gate {
			Gate::Pending => Err(MailboxSendError::NotOpen(msg)),
			Gate::Closed => Err(MailboxSendError::Closed(msg)),
			Gate::Open => {
				state.queue.push_back(msg);
				let depth = state.queue.len();
				drop(state);
				self.notify_recv.notify_one();
				Ok(depth)
			}
		}
	}

	/// Blocks for the next message. Returns `None` once the mailbox is closed
	/// and drained.
	pub fn recv(&self) -> Option<T> {
		let mut state = self.state.lock();
		loop {
			if let Some(msg) = state.queue.pop_front() {
				return Some(msg);
			}
			if state.gate == Gate::Closed {
				return None;
			}
			self.notify_recv.wait(&mut state);
		}
	}

	/// Refuses further sends and wakes the receiver so it can drain and exit.
	pub fn close(&self) {
		self.state.lock().gate = Gate::Closed;
		self.notify_recv.notify_all();
	}

	/// Closes the mailbox and removes everything still queued.
	pub fn close_and_drain(&self) -> Vec<T> {
		let mut state = self.state.lock();
		state.gate = Gate::Closed;
		let drained = state.queue.drain(..).collect();
		drop(state);
		self.notify_recv.notify_all();
		drained
	}

	/// Returns current queue length.
	pub fn len(&self) -> usize {
		self.state.lock().queue.len()
	}
}
