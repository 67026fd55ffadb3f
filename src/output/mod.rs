//! Output module
//!
//! Progress colors, the final summary formats and the interactive pager.

mod color;
pub mod editor;
mod formatter;
pub mod pager;

pub use color::{strip, Color, ColorName};
pub use formatter::{summary, JsonReport, OutputFormat, SummaryFormatter};
pub use pager::{CommandRerunner, Pager, Rerun};
