//! Loupe - parallel test runner
//!
//! Runs the bundled smoke suite through the same entry point test binaries
//! use.
//!
//! ## Usage
//!
//! ```bash
//! # Run everything, paging through failures on a terminal
//! loupe
//!
//! # Run one file, or the test defined on one line
//! loupe src/suite/mod.rs
//! loupe src/suite/mod.rs:40
//!
//! # Worker processes, fixed order, machine-readable summary
//! loupe --processes --seed 7 --format json
//!
//! # List registered classes
//! loupe --list
//! ```

use anyhow::Result;
use clap::Parser;

mod suite;

use loupe::cli::{self, Args};
use loupe::registry;

#[tokio::main]
async fn main() -> Result<()> {
    suite::register();

    let status = cli::run(Args::parse(), registry::snapshot()).await?;
    std::process::exit(status);
}
