//! Checks on the output a block writes

use regex::Regex;

use crate::case::Test;
use crate::error::Outcome;

/// What one captured stream is compared against
#[derive(Clone, Debug)]
pub enum StreamMatcher {
    /// The stream must match the pattern
    Pattern(Regex),
    /// The stream must equal the text exactly
    Text(String),
}

impl From<Regex> for StreamMatcher {
    fn from(pattern: Regex) -> Self {
        StreamMatcher::Pattern(pattern)
    }
}

impl From<&str> for StreamMatcher {
    fn from(text: &str) -> Self {
        StreamMatcher::Text(text.to_string())
    }
}

impl From<String> for StreamMatcher {
    fn from(text: String) -> Self {
        StreamMatcher::Text(text)
    }
}

impl Test {
    /// Run `block` with its output captured, then check each stream that
    /// has a matcher.
    ///
    /// ```ignore
    /// t.expect_output_to_match(Some("hello\n".into()), None, |t| {
    ///     t.puts("hello");
    ///     Ok(())
    /// })?;
    /// ```
    ///
    /// # Panics
    ///
    /// When neither stream has a matcher: that is a mistake in the test
    /// itself, not a test outcome.
    #[track_caller]
    pub fn expect_output_to_match(
        &mut self,
        stdout: Option<StreamMatcher>,
        stderr: Option<StreamMatcher>,
        block: impl FnOnce(&mut Test) -> Outcome,
    ) -> Outcome {
        assert!(
            stdout.is_some() || stderr.is_some(),
            "expect_output_to_match needs a matcher for stdout or stderr"
        );

        let (outcome, out, err) = self.capture_io(block);
        outcome?;

        if let Some(matcher) = stdout {
            self.match_or_equal(matcher, &out)?;
        }
        if let Some(matcher) = stderr {
            self.match_or_equal(matcher, &err)?;
        }
        Ok(())
    }

    /// Inverse of [`Test::expect_output_to_match`]
    ///
    /// # Panics
    ///
    /// When neither stream has a matcher.
    #[track_caller]
    pub fn expect_output_to_not_match(
        &mut self,
        stdout: Option<StreamMatcher>,
        stderr: Option<StreamMatcher>,
        block: impl FnOnce(&mut Test) -> Outcome,
    ) -> Outcome {
        assert!(
            stdout.is_some() || stderr.is_some(),
            "expect_output_to_not_match needs a matcher for stdout or stderr"
        );

        let (outcome, out, err) = self.capture_io(block);
        outcome?;

        if let Some(matcher) = stdout {
            self.refute_match_or_equal(matcher, &out)?;
        }
        if let Some(matcher) = stderr {
            self.refute_match_or_equal(matcher, &err)?;
        }
        Ok(())
    }

    /// Both streams stay empty while `block` runs
    #[track_caller]
    pub fn expect_output_to_be_empty(
        &mut self,
        block: impl FnOnce(&mut Test) -> Outcome,
    ) -> Outcome {
        self.expect_output_to_match(Some("".into()), Some("".into()), block)
    }

    /// Both streams receive something while `block` runs
    #[track_caller]
    pub fn expect_output_to_not_be_empty(
        &mut self,
        block: impl FnOnce(&mut Test) -> Outcome,
    ) -> Outcome {
        self.expect_output_to_not_match(Some("".into()), Some("".into()), block)
    }

    #[track_caller]
    fn match_or_equal(&mut self, matcher: StreamMatcher, output: &str) -> Outcome {
        match matcher {
            StreamMatcher::Pattern(pattern) => self.expect(pattern).to_match(output).map(|_| ()),
            StreamMatcher::Text(text) => self.expect(text).to_be_equal_to(output).map(|_| ()),
        }
    }

    #[track_caller]
    fn refute_match_or_equal(&mut self, matcher: StreamMatcher, output: &str) -> Outcome {
        match matcher {
            StreamMatcher::Pattern(pattern) => {
                self.expect(pattern).to_not_match(output).map(|_| ())
            }
            StreamMatcher::Text(text) => self.expect(text).to_not_be_equal_to(output).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{sample, Sink};
    use std::io::Write;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_output_matches_text_and_pattern() {
        let mut test = sample();
        let outcome = test.expect_output_to_match(
            Some("hello\n".into()),
            Some(Regex::new(r"^warning: \d+").unwrap().into()),
            |t| {
                t.puts("hello");
                write!(t.stderr(), "warning: 42").unwrap();
                Ok(())
            },
        );

        assert!(outcome.is_ok());
        assert_eq!(test.reporter().expectation_count(), 2);
        assert!(matches!(test.stdout(), Sink::Stdout));
    }

    #[test]
    fn test_only_given_streams_are_checked() {
        let mut test = sample();
        let outcome = test.expect_output_to_match(None, Some("oops\n".into()), |t| {
            t.puts("ignored");
            t.eputs("oops");
            Ok(())
        });

        assert!(outcome.is_ok());
        assert_eq!(test.reporter().expectation_count(), 1);
    }

    #[test]
    fn test_output_mismatch_fails() {
        let mut test = sample();
        let outcome = test.expect_output_to_match(Some("bye\n".into()), None, |t| {
            t.puts("hello");
            Ok(())
        });

        assert!(outcome.is_err());
        let failure = &test.reporter().failures()[0];
        assert_eq!(failure.message, "Expected \"bye\\n\" to be equal to \"hello\\n\".");
    }

    #[test]
    fn test_empty_and_not_empty() {
        let mut test = sample();
        assert!(test.expect_output_to_be_empty(|_| Ok(())).is_ok());
        assert!(test
            .expect_output_to_not_be_empty(|t| {
                t.puts("out");
                t.eputs("err");
                Ok(())
            })
            .is_ok());
        assert!(test
            .expect_output_to_not_match(Some(Regex::new("python").unwrap().into()), None, |t| {
                t.puts("rust");
                Ok(())
            })
            .is_ok());
    }

    #[test]
    fn test_failure_inside_block_is_propagated() {
        let mut test = sample();
        let outcome = test.expect_output_to_be_empty(|t| {
            t.expect(1).to_be_equal_to(2)?;
            Ok(())
        });

        assert!(outcome.is_err());
        assert_eq!(test.reporter().failure_count(), 1);
        assert!(matches!(test.stderr(), Sink::Stderr));
    }

    #[test]
    fn test_missing_matchers_panic() {
        let mut test = sample();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            test.expect_output_to_match(None, None, |_| Ok(()))
        }));
        assert!(result.is_err());
    }
}
