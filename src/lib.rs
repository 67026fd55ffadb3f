//! Loupe - parallel test execution engine
//!
//! Test classes are fixture types with `test*` methods registered as plain
//! function pointers. The engine builds a shuffled work queue from the
//! registry, drains it with worker tasks or worker processes, merges the
//! partial reporters and renders the result as a plain summary or in an
//! interactive failure pager.
//!
//! ## Usage
//!
//! ```no_run
//! use loupe::{Outcome, Test, TestCase, TestClass};
//!
//! #[derive(Default)]
//! struct MathTest;
//!
//! impl TestCase for MathTest {}
//!
//! impl MathTest {
//!     fn test_addition(&mut self, t: &mut Test) -> Outcome {
//!         t.expect(1 + 1).to_be_equal_to(2)?;
//!         Ok(())
//!     }
//! }
//!
//! TestClass::builder::<MathTest>("MathTest")
//!     .test("test_addition", MathTest::test_addition)
//!     .register();
//! ```

pub mod case;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod expectation;
pub mod models;
pub mod output;
pub mod utils;

pub use case::{registry, Registry, Test, TestCase, TestClass};
pub use config::Options;
pub use error::{ExpectationFailed, LoupeError, Outcome};
pub use expectation::{Expectation, Operator, StreamMatcher, DEFAULT_DELTA};
pub use models::{Failure, Reporter};
