//! Data models for test runs
//!
//! Failure records and the reporter that accumulates them.

pub(crate) mod failure;
mod reporter;

pub use failure::Failure;
pub use reporter::Reporter;
