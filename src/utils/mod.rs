//! Utility modules
//!
//! Logging, timing and source lookup helpers.

pub mod logger;
pub mod source;
pub mod timer;

pub use logger::{init_logger, LogLevel};
pub use timer::Timer;
