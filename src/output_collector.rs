//! # `output_collector`
//!
//! Collects output written by code under test into memory, then asserts on
//! it line by line.
//!
//! Hand the [`OutputCollector::stream`] writer to the code under test in
//! place of stdout. The first assertion seals the collector; writes arriving
//! after that point are not seen by the assertions.

use std::io::{self, BufRead, BufReader, Cursor, Write};
use std::sync::{Arc, Mutex};

/// Collects written output and asserts on the collected lines.
///
/// # Example
/// ```
/// use std::io::Write;
/// use app_test_harness::OutputCollector;
///
/// let mut collector = OutputCollector::new();
/// let mut stream = collector.stream();
/// writeln!(stream, "hello").unwrap();
///
/// collector.assert_line("hello");
/// collector.assert_no_more_lines();
/// ```
#[derive(Debug, Default)]
pub struct OutputCollector {
    storage: Arc<Mutex<Vec<u8>>>,
    reader: Option<BufReader<Cursor<Vec<u8>>>>,
}

/// Writer handle backed by an [`OutputCollector`].
#[derive(Debug, Clone)]
pub struct CollectorStream {
    storage: Arc<Mutex<Vec<u8>>>,
}

impl OutputCollector {
    /// Create a new, empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stream to which the code under test can write its output.
    pub fn stream(&self) -> CollectorStream {
        CollectorStream {
            storage: Arc::clone(&self.storage),
        }
    }

    /// Assert that the next line collected holds the given string.
    ///
    /// Specify the line without any newline characters.
    ///
    /// # Panics
    /// Panics if the next collected line differs from `expected_line` or if
    /// no lines remain.
    pub fn assert_line(&mut self, expected_line: &str) {
        match self.read_line() {
            Some(line) => assert_eq!(expected_line, line, "collected line"),
            None => panic!("Expected line {expected_line:?} but no more lines were collected"),
        }
    }

    /// Assert that no more lines were collected.
    ///
    /// # Panics
    /// Panics if another line remains, quoting it.
    pub fn assert_no_more_lines(&mut self) {
        if let Some(line) = self.read_line() {
            panic!("No more lines but was: {line:?}");
        }
    }

    /// Seal the collector on first use and read the next line.
    fn read_line(&mut self) -> Option<String> {
        if self.reader.is_none() {
            let output = self.storage.lock().unwrap().clone();
            self.reader = Some(BufReader::new(Cursor::new(output)));
        }
        // Sealed just above
        let reader = self.reader.as_mut().unwrap();
        let mut line = String::new();
        // Reading from an in-memory buffer cannot fail
        let bytes_read = reader.read_line(&mut line).unwrap();
        if bytes_read == 0 {
            return None;
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

impl Write for CollectorStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.storage.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_and_asserts_lines() {
        let mut collector = OutputCollector::new();
        let mut stream = collector.stream();
        writeln!(stream, "first line").unwrap();
        writeln!(stream, "second line").unwrap();

        collector.assert_line("first line");
        collector.assert_line("second line");
        collector.assert_no_more_lines();
    }

    #[test]
    fn empty_collector_has_no_lines() {
        let mut collector = OutputCollector::new();
        collector.assert_no_more_lines();
    }

    #[test]
    #[should_panic(expected = "collected line")]
    fn mismatching_line_panics() {
        let mut collector = OutputCollector::new();
        writeln!(collector.stream(), "actual").unwrap();
        collector.assert_line("expected");
    }

    #[test]
    #[should_panic(expected = "No more lines but was: \"leftover\"")]
    fn leftover_line_panics() {
        let mut collector = OutputCollector::new();
        writeln!(collector.stream(), "leftover").unwrap();
        collector.assert_no_more_lines();
    }

    #[test]
    fn writes_after_sealing_are_ignored() {
        let mut collector = OutputCollector::new();
        let mut stream = collector.stream();
        writeln!(stream, "before").unwrap();
        collector.assert_line("before");
        writeln!(stream, "after").unwrap();
        collector.assert_no_more_lines();
    }
}
