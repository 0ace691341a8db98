//! # `app_executor`
//!
//! Launches a command-line application under test as a subprocess and lets
//! the test assert on its output, line by line.
//!
//! Both stdout and stderr are captured through pipes and read line-buffered.
//! Line and exit-code assertions panic on mismatch, like `assert_eq!` does;
//! I/O failures while reading from the process are returned as
//! [`AppExecutorError`].

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};

use regex::Regex;
use tracing::debug;

/// Represents an error raised by an [`AppExecutor`].
///
/// These are environmental failures (the process could not be spawned, a
/// pipe could not be read). Assertion mismatches panic instead.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum AppExecutorError {
    #[error("No command was set before calling execute")]
    NoCommandSet,
    #[error("The application was not executed yet")]
    NotExecuted,
    #[error("Failed to spawn process '{0}': {1}")]
    UnableToSpawnProcess(String, io::Error),
    #[error("Failed to read from the process stdout: {0}")]
    UnableToReadStdout(io::Error),
    #[error("Failed to read from the process stderr: {0}")]
    UnableToReadStderr(io::Error),
    #[error("Failed to wait for the process to terminate: {0}")]
    UnableToWaitForExit(io::Error),
    #[error("Failed to kill the process: {0}")]
    UnableToKillProcess(io::Error),
    #[error("Invalid line pattern '{0}': {1}")]
    InvalidLinePattern(String, regex::Error),
}

use AppExecutorError::{
    InvalidLinePattern, NoCommandSet, NotExecuted, UnableToKillProcess, UnableToReadStderr,
    UnableToReadStdout, UnableToSpawnProcess, UnableToWaitForExit,
};

/// Runs a command-line application and asserts on its output and exit code.
///
/// # Example
/// ```no_run
/// use app_test_harness::AppExecutor;
///
/// let mut executor = AppExecutor::new("echo");
/// executor.add_arg("hello");
/// executor.execute().unwrap();
/// executor.assert_line_of_output("hello").unwrap();
/// executor.assert_no_more_output().unwrap();
/// executor.assert_normal_exit().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct AppExecutor {
    args: Vec<String>,
    command_set: bool,
    session: Option<AppSession>,
}

/// Handle to the spawned process with its line-buffered output readers.
#[derive(Debug)]
struct AppSession {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
}

impl AppExecutor {
    /// Create a new executor for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        let mut executor = Self::default();
        executor.set_command(command);
        executor
    }

    /// Create a new executor without a command. [`AppExecutor::execute`]
    /// fails until [`AppExecutor::set_command`] is called.
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Set the command name of the application under test.
    pub fn set_command(&mut self, command: impl Into<String>) {
        self.command_set = true;
        self.args.insert(0, command.into());
    }

    /// Add one command-line argument to the application under test.
    pub fn add_arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Add several command-line arguments to the application under test.
    pub fn add_args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
    }

    /// Execute the application under test.
    ///
    /// Spawns the process with both output streams piped. Fails with
    /// [`AppExecutorError::NoCommandSet`] if no command was configured.
    pub fn execute(&mut self) -> Result<(), AppExecutorError> {
        if !self.command_set {
            return Err(NoCommandSet);
        }
        debug!("executing: {}", self.display_command());

        let mut child = Command::new(&self.args[0])
            .args(&self.args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| UnableToSpawnProcess(self.args[0].clone(), e))?;

        // Both handles are piped above, so they are always present
        let stdout = child.stdout.take().map(BufReader::new);
        let stderr = child.stderr.take().map(BufReader::new);
        match (stdout, stderr) {
            (Some(stdout), Some(stderr)) => {
                self.session = Some(AppSession {
                    child,
                    stdout,
                    stderr,
                });
                Ok(())
            }
            _ => Err(UnableToSpawnProcess(
                self.args[0].clone(),
                io::Error::new(io::ErrorKind::BrokenPipe, "output pipes missing"),
            )),
        }
    }

    /// Assert that the application outputs the given line on stdout.
    ///
    /// Specify the line without any line-terminating characters.
    ///
    /// # Panics
    /// Panics if the next line of stdout differs from `expected_line` or if
    /// the stream already ended.
    pub fn assert_line_of_output(&mut self, expected_line: &str) -> Result<(), AppExecutorError> {
        let line = self.read_line_of_output()?;
        assert_line("line of output on STDOUT", expected_line, line.as_deref());
        Ok(())
    }

    /// Assert that the next line of stdout matches the given regex pattern.
    ///
    /// # Panics
    /// Panics if the next line of stdout does not match `pattern` or if the
    /// stream already ended.
    pub fn assert_line_of_output_matches(
        &mut self,
        pattern: &str,
    ) -> Result<(), AppExecutorError> {
        let regex = compile_pattern(pattern)?;
        let line = self.read_line_of_output()?;
        assert_line_matches("line of output on STDOUT", &regex, line.as_deref());
        Ok(())
    }

    /// Assert that the application outputs the given line on stderr.
    ///
    /// Specify the line without any line-terminating characters.
    ///
    /// # Panics
    /// Panics if the next line of stderr differs from `expected_line` or if
    /// the stream already ended.
    pub fn assert_line_of_error(&mut self, expected_line: &str) -> Result<(), AppExecutorError> {
        let line = self.read_line_of_error()?;
        assert_line("line of output on STDERR", expected_line, line.as_deref());
        Ok(())
    }

    /// Assert that the next line of stderr matches the given regex pattern.
    ///
    /// # Panics
    /// Panics if the next line of stderr does not match `pattern` or if the
    /// stream already ended.
    pub fn assert_line_of_error_matches(&mut self, pattern: &str) -> Result<(), AppExecutorError> {
        let regex = compile_pattern(pattern)?;
        let line = self.read_line_of_error()?;
        assert_line_matches("line of output on STDERR", &regex, line.as_deref());
        Ok(())
    }

    /// Assert that there is no more output on stdout.
    ///
    /// Drains the stream until end of file.
    ///
    /// # Panics
    /// Panics if any output remains, quoting it verbatim.
    pub fn assert_no_more_output(&mut self) -> Result<(), AppExecutorError> {
        let remaining = drain(&mut self.session()?.stdout).map_err(UnableToReadStdout)?;
        assert_drained("STDOUT", &remaining);
        Ok(())
    }

    /// Assert that there is no more output on stderr.
    ///
    /// Drains the stream until end of file.
    ///
    /// # Panics
    /// Panics if any output remains, quoting it verbatim.
    pub fn assert_no_more_errors(&mut self) -> Result<(), AppExecutorError> {
        let remaining = drain(&mut self.session()?.stderr).map_err(UnableToReadStderr)?;
        assert_drained("STDERR", &remaining);
        Ok(())
    }

    /// Assert that the application terminates with a status code of zero.
    ///
    /// Blocks until the process terminates.
    ///
    /// # Panics
    /// Panics if the status code differs from zero.
    pub fn assert_normal_exit(&mut self) -> Result<(), AppExecutorError> {
        self.assert_exit(0)
    }

    /// Assert that the application terminates with the given status code.
    ///
    /// Blocks until the process terminates.
    ///
    /// # Panics
    /// Panics if the status code differs from `expected_status_code`, or if
    /// the process was terminated by a signal.
    pub fn assert_exit(&mut self, expected_status_code: i32) -> Result<(), AppExecutorError> {
        let command = self.display_command();
        let status = self
            .session()?
            .child
            .wait()
            .map_err(UnableToWaitForExit)?;
        match status.code() {
            Some(code) => assert_eq!(
                expected_status_code, code,
                "status code of '{command}'"
            ),
            None => panic!("'{command}' was terminated by a signal instead of exiting with status code {expected_status_code}"),
        }
        Ok(())
    }

    /// Force-terminate the application early.
    ///
    /// Useful for daemon-style applications under test that never exit on
    /// their own. The process is reaped afterwards.
    pub fn kill(&mut self) -> Result<(), AppExecutorError> {
        let session = self.session()?;
        session.child.kill().map_err(UnableToKillProcess)?;
        session.child.wait().map_err(UnableToWaitForExit)?;
        Ok(())
    }

    fn session(&mut self) -> Result<&mut AppSession, AppExecutorError> {
        self.session.as_mut().ok_or(NotExecuted)
    }

    fn read_line_of_output(&mut self) -> Result<Option<String>, AppExecutorError> {
        read_line(&mut self.session()?.stdout).map_err(UnableToReadStdout)
    }

    fn read_line_of_error(&mut self) -> Result<Option<String>, AppExecutorError> {
        read_line(&mut self.session()?.stderr).map_err(UnableToReadStderr)
    }

    fn display_command(&self) -> String {
        self.args.join(" ")
    }
}

/// Read one line, without its terminator. `None` on end of stream.
fn read_line(reader: &mut impl BufRead) -> Result<Option<String>, io::Error> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line)?;
    if bytes_read == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Read the stream to the end and return everything left on it.
fn drain(reader: &mut impl Read) -> Result<String, io::Error> {
    let mut remaining = String::new();
    reader.read_to_string(&mut remaining)?;
    Ok(remaining)
}

fn compile_pattern(pattern: &str) -> Result<Regex, AppExecutorError> {
    Regex::new(pattern).map_err(|e| InvalidLinePattern(pattern.to_string(), e))
}

fn assert_line(what: &str, expected: &str, actual: Option<&str>) {
    match actual {
        Some(actual) => assert_eq!(expected, actual, "{what}"),
        None => panic!("{what}: expected {expected:?} but the stream has ended"),
    }
}

fn assert_line_matches(what: &str, regex: &Regex, actual: Option<&str>) {
    match actual {
        Some(actual) => assert!(
            regex.is_match(actual),
            "{what}: {actual:?} does not match pattern {:?}",
            regex.as_str()
        ),
        None => panic!(
            "{what}: expected a line matching {:?} but the stream has ended",
            regex.as_str()
        ),
    }
}

fn assert_drained(stream_name: &str, remaining: &str) {
    assert!(
        remaining.is_empty(),
        "Expected no more output on {stream_name} but was:\n{remaining}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_without_command_fails() {
        let mut executor = AppExecutor::uninitialized();
        assert!(matches!(executor.execute(), Err(NoCommandSet)));
    }

    #[test]
    fn assertions_before_execute_fail() {
        let mut executor = AppExecutor::new("true");
        assert!(matches!(
            executor.assert_no_more_output(),
            Err(NotExecuted)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn invalid_pattern_is_reported() {
        let mut executor = AppExecutor::new("true");
        executor.execute().unwrap();
        assert!(matches!(
            executor.assert_line_of_output_matches("(unclosed"),
            Err(InvalidLinePattern(_, _))
        ));
    }

    #[test]
    fn read_line_strips_terminators() {
        let mut reader = BufReader::new("first\r\nsecond\n".as_bytes());
        assert_eq!(Some("first".to_string()), read_line(&mut reader).unwrap());
        assert_eq!(Some("second".to_string()), read_line(&mut reader).unwrap());
        assert_eq!(None, read_line(&mut reader).unwrap());
    }

    #[test]
    #[should_panic(expected = "no more output on STDOUT")]
    fn drained_assertion_quotes_leftover() {
        assert_drained("STDOUT", "leftover line\n");
    }
}
