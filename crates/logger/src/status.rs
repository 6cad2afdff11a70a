use std::fmt;

/// Outcome notification delivered to the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStatus {
	/// A line was appended.
	WriteSucceeded,
	/// Buffered lines reached the sink.
	FlushSucceeded,
}

impl LogStatus {
	/// Human-readable status text.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::WriteSucceeded => "Write success!",
			Self::FlushSucceeded => "Flush success!",
		}
	}
}

impl fmt::Display for LogStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Single-slot status subscriber. Runs on the logger thread.
pub type StatusCallback = Box<dyn FnMut(LogStatus) + Send>;
