//! Error types
//!
//! `ExpectationFailed` is the control signal that aborts a single test body.
//! `LoupeError` covers everything else the engine can run into.

use thiserror::Error;

/// Raised by a failed check. Carries no data: the failure itself has
/// already been recorded in the owning test's reporter.
///
/// Only checks can produce one, so every `Err` a test body returns has a
/// matching failure record:
///
/// ```compile_fail
/// let _ = loupe::ExpectationFailed(());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("expectation failed")]
pub struct ExpectationFailed(());

impl ExpectationFailed {
    pub(crate) fn new() -> Self {
        Self(())
    }
}

/// Result of a test body, hook or check chain
pub type Outcome = Result<(), ExpectationFailed>;

/// Engine errors
#[derive(Debug, Error)]
pub enum LoupeError {
    #[error("unknown test class `{0}`")]
    UnknownClass(String),

    #[error("unknown test method `{class}::{method}`")]
    UnknownMethod { class: String, method: String },

    #[error("invalid test selector `{0}`")]
    InvalidSelector(String),

    #[error("worker protocol error: {0}")]
    Protocol(String),

    #[error("editor `{0}` not found on PATH")]
    EditorNotFound(String),

    #[error("no editor configured (set --editor or $EDITOR)")]
    NoEditor,

    #[error("the {0} strategy is not supported on this platform")]
    UnsupportedStrategy(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LoupeError::UnknownMethod {
            class: "SmokeTest".into(),
            method: "test_missing".into(),
        };
        assert_eq!(err.to_string(), "unknown test method `SmokeTest::test_missing`");
        assert_eq!(ExpectationFailed::new().to_string(), "expectation failed");
    }
}
