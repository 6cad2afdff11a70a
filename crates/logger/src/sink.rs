use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// Destination for flushed log lines.
#[derive(Debug, Clone, Default)]
pub enum LogSink {
	#[default]
	Stdout,
	Stderr,
	/// Appends to a file, creating it if needed.
	File(PathBuf),
	/// Collects lines in memory.
	Memory(MemorySink),
}

impl LogSink {
	/// Writes one batch of lines.
	pub(crate) fn emit(&self, lines: &[String]) -> io::Result<()> {
		if lines.is_empty() {
			return Ok(());
		}
		match self {
			Self::Stdout => write_lines(&mut io::stdout().lock(), lines),
			Self::Stderr => write_lines(&mut io::stderr().lock(), lines),
			Self::File(path) => {
				let file = OpenOptions::new().create(true).append(true).open(path)?;
				write_lines(&mut BufWriter::new(file), lines)
			}
			Self::Memory(memory) => {
				memory.lines.lock().extend(lines.iter().cloned());
				Ok(())
			}
		}
	}
}

fn write_lines(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
	for line in lines {
		writeln!(out, "{line}")?;
	}
	out.flush()
}

/// Shared in-memory sink. Clones see the same lines.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
	lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
	/// Empty sink.
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy of every line emitted so far.
	pub fn lines(&self) -> Vec<String> {
		self.lines.lock().clone()
	}

	/// Number of lines emitted so far.
	pub fn len(&self) -> usize {
		self.lines.lock().len()
	}

	/// Whether nothing has been emitted.
	pub fn is_empty(&self) -> bool {
		self.lines.lock().is_empty()
	}

	/// Removes and returns every line emitted so far.
	pub fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.lines.lock())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn file_sink_appends_batches() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("log.txt");
		let sink = LogSink::File(path.clone());

		sink.emit(&["one".into(), "two".into()]).unwrap();
		sink.emit(&["three".into()]).unwrap();

		assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");
	}

	#[test]
	fn empty_batch_touches_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("never.txt");
		LogSink::File(path.clone()).emit(&[]).unwrap();
		assert!(!path.exists());
	}

	#[test]
	fn memory_sink_is_shared_between_clones() {
		let memory = MemorySink::new();
		let sink = LogSink::Memory(memory.clone());
		sink.emit(&["x".into()]).unwrap();
		assert_eq!(memory.lines(), vec!["x".to_string()]);
		assert_eq!(memory.take().len(), 1);
		assert!(memory.is_empty());
	}

	#[test]
	fn file_sink_reports_unwritable_path() {
		let dir = tempfile::tempdir().unwrap();
		let sink = LogSink::File(dir.path().join("missing").join("log.txt"));
		assert!(sink.emit(&["x".into()]).is_err());
	}
}
