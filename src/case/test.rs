//! A single test execution
//!
//! A `Test` binds one method of one class to its own reporter. It is
//! created right before the method runs and discarded afterwards.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use crate::error::Outcome;
use crate::expectation::Expectation;
use crate::models::Reporter;
use crate::output::Color;

/// Destination for a test's standard output or error
#[derive(Debug)]
pub enum Sink {
    Stdout,
    Stderr,
    Buffer(Vec<u8>),
}

impl Sink {
    fn into_string(self) -> String {
        match self {
            Sink::Buffer(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            _ => String::new(),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::Buffer(bytes) => bytes.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::Buffer(_) => Ok(()),
        }
    }
}

/// Test instance state
pub struct Test {
    class_name: String,
    name: String,
    file: String,
    line: u32,
    color: Color,
    reporter: Reporter,
    stdout: Sink,
    stderr: Sink,
}

impl Test {
    pub fn new(
        class_name: impl Into<String>,
        name: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        color: Color,
        reporter: Reporter,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            file: file.into(),
            line,
            color,
            reporter,
            stdout: Sink::Stdout,
            stderr: Sink::Stderr,
        }
    }

    /// Run `body` once.
    ///
    /// The test is counted up front. Success is only counted when the body
    /// (hooks included) finishes; a failed check has already recorded its
    /// failure, so the error is passed through untouched.
    pub fn run(&mut self, body: impl FnOnce(&mut Test) -> Outcome) -> Outcome {
        self.reporter.increment_test_count();
        body(self)?;
        self.reporter.increment_success_count();
        Ok(())
    }

    /// Wrap `target` for a chain of checks
    pub fn expect<T>(&mut self, target: T) -> Expectation<'_, T> {
        Expectation::new(target, self)
    }

    /// Standard output as seen by this test
    pub fn stdout(&mut self) -> &mut Sink {
        &mut self.stdout
    }

    /// Standard error as seen by this test
    pub fn stderr(&mut self) -> &mut Sink {
        &mut self.stderr
    }

    /// Write `text` and a newline to this test's standard output
    pub fn puts(&mut self, text: impl std::fmt::Display) {
        let _ = writeln!(self.stdout, "{text}");
    }

    /// Write `text` and a newline to this test's standard error
    pub fn eputs(&mut self, text: impl std::fmt::Display) {
        let _ = writeln!(self.stderr, "{text}");
    }

    /// Run `block` with both sinks redirected into buffers.
    ///
    /// The previous sinks are restored on every exit path, including a
    /// panic inside `block`, which is then resumed.
    pub(crate) fn capture_io(
        &mut self,
        block: impl FnOnce(&mut Test) -> Outcome,
    ) -> (Outcome, String, String) {
        let stdout = std::mem::replace(&mut self.stdout, Sink::Buffer(Vec::new()));
        let stderr = std::mem::replace(&mut self.stderr, Sink::Buffer(Vec::new()));

        let result = panic::catch_unwind(AssertUnwindSafe(|| block(self)));

        let out = std::mem::replace(&mut self.stdout, stdout).into_string();
        let err = std::mem::replace(&mut self.stderr, stderr).into_string();

        match result {
            Ok(outcome) => (outcome, out, err),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub(crate) fn reporter_mut(&mut self) -> &mut Reporter {
        &mut self.reporter
    }

    pub fn into_reporter(self) -> Reporter {
        self.reporter
    }
}

#[cfg(test)]
pub(crate) fn sample() -> Test {
    Test::new(
        "SampleTest",
        "test_sample",
        file!(),
        1,
        Color::new(false),
        Reporter::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_counts_success() {
        let mut test = sample();
        assert!(test.run(|t| t.expect(1).to_be_equal_to(1).map(|_| ())).is_ok());

        let reporter = test.into_reporter();
        assert_eq!(reporter.test_count(), 1);
        assert_eq!(reporter.success_count(), 1);
        assert_eq!(reporter.expectation_count(), 1);
        assert!(reporter.failures().is_empty());
    }

    #[test]
    fn test_run_aborts_on_first_failure() {
        let mut test = sample();
        let mut reached = false;
        let outcome = test.run(|t| {
            t.expect(false).to_be_truthy()?;
            reached = true;
            Ok(())
        });

        assert!(outcome.is_err());
        assert!(!reached);
        let reporter = test.into_reporter();
        assert_eq!(reporter.test_count(), 1);
        assert_eq!(reporter.success_count(), 0);
        assert_eq!(reporter.failure_count(), 1);
    }

    #[test]
    fn test_capture_io_restores_sinks() {
        let mut test = sample();
        let (outcome, out, err) = test.capture_io(|t| {
            t.puts("hello");
            t.eputs("oops");
            Ok(())
        });

        assert!(outcome.is_ok());
        assert_eq!(out, "hello\n");
        assert_eq!(err, "oops\n");
        assert!(matches!(test.stdout(), Sink::Stdout));
        assert!(matches!(test.stderr(), Sink::Stderr));
    }

    #[test]
    fn test_capture_io_restores_sinks_after_panic() {
        let mut test = sample();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            test.capture_io(|t| {
                t.puts("before the panic");
                panic!("boom");
            })
        }));

        assert!(result.is_err());
        assert!(matches!(test.stdout(), Sink::Stdout));
        assert!(matches!(test.stderr(), Sink::Stderr));
    }

    #[test]
    fn test_nested_capture() {
        let mut test = sample();
        let (_, outer, _) = test.capture_io(|t| {
            t.puts("outer");
            let (_, inner, _) = t.capture_io(|t| {
                t.puts("inner");
                Ok(())
            });
            assert_eq!(inner, "inner\n");
            Ok(())
        });
        assert_eq!(outer, "outer\n");
    }
}
