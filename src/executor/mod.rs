//! Test execution engine
//!
//! Builds the work queue from the registry and drains it with either
//! in-process worker tasks or worker processes.

mod parallel;
mod process;
mod queue;
mod runner;

#[cfg(unix)]
mod protocol;
#[cfg(unix)]
mod server;

pub use parallel::ParallelExecutor;
pub use process::{run_worker, ProcessExecutor};
#[cfg(unix)]
pub use protocol::{Client, Request, Response};
pub use queue::{WorkItem, WorkQueue};
pub use runner::execute;
#[cfg(unix)]
pub use server::QueueServer;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::case::Registry;
use crate::config::{Options, Strategy};
use crate::models::Reporter;
use crate::utils::Timer;

/// Workers to start: the requested count (hardware parallelism by
/// default), at least one while anything is queued, never more than there
/// are items
pub fn worker_count(requested: Option<usize>, queued: usize) -> usize {
    let requested = requested.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    requested.max(1).min(queued)
}

/// Run every selected test and return the merged reporter together with
/// the timer started before the first test
pub async fn run(registry: Arc<Registry>, options: &Options) -> Result<(Reporter, Timer)> {
    let timer = Timer::start("test run");
    let queue = WorkQueue::populate(&registry, options.seed);
    info!(
        "Queued {} tests, strategy {}",
        queue.len(),
        options.strategy.name()
    );

    let reporter = match options.strategy {
        Strategy::Threads => {
            ParallelExecutor::new(registry, options.clone())
                .run(queue)
                .await?
        }
        Strategy::Processes => {
            ProcessExecutor::new(registry, options.clone())
                .run(queue)
                .await?
        }
    };

    info!(
        "Finished {} tests in {:.3}s",
        reporter.test_count(),
        timer.elapsed_secs()
    );
    Ok((reporter, timer))
}
