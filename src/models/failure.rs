//! Failure records
//!
//! One immutable record per failed check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

use crate::case::Test;
use crate::output::{Color, ColorName};

/// A single failed expectation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Source file of the failing check
    pub file: String,
    /// Name of the test method that failed
    pub test_name: String,
    /// Line of the failing check
    pub line: u32,
    pub message: String,
    /// Registered class the test belongs to, used for reruns
    pub class_name: String,
    pub color: Color,
}

impl Failure {
    /// Build a failure for `test`, located at the failing check
    pub fn new(test: &Test, message: impl Into<String>, location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            test_name: test.name().to_string(),
            line: location.line(),
            message: message.into(),
            class_name: test.class_name().to_string(),
            color: test.color(),
        }
    }

    /// `path:line at test_name` and the message, split for the pager footer
    pub fn location_and_message(&self) -> (String, &str) {
        (
            format!(
                "{}:{} at {}",
                self.file,
                self.line,
                self.color.paint(&self.test_name, ColorName::Yellow)
            ),
            &self.message,
        )
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (location, message) = self.location_and_message();
        write!(f, "{location}. {message}")
    }
}

#[cfg(test)]
pub(crate) fn sample(test_name: &str, line: u32) -> Failure {
    Failure {
        file: "tests/sample.rs".to_string(),
        test_name: test_name.to_string(),
        line,
        message: "Expected false to be truthy.".to_string(),
        class_name: "SampleTest".to_string(),
        color: Color::new(false),
    }
}
