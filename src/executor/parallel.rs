//! In-process parallel execution
//!
//! Each worker is a task with its own command channel. Workers share
//! nothing mutable with the controller: items go out over a worker's
//! channel and partial reporters come back over a shared result channel.
//! Whichever worker reports first gets the next item.

use anyhow::{bail, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{runner, worker_count, WorkItem, WorkQueue};
use crate::case::Registry;
use crate::config::Options;
use crate::models::Reporter;

#[derive(Debug)]
enum Command {
    Run(WorkItem),
    Stop,
}

/// Parallel test executor
pub struct ParallelExecutor {
    registry: Arc<Registry>,
    options: Arc<Options>,
}

impl ParallelExecutor {
    pub fn new(registry: Arc<Registry>, options: Options) -> Self {
        Self {
            registry,
            options: Arc::new(options),
        }
    }

    /// Drain `queue` and return the merged reporter
    pub async fn run(&self, mut queue: WorkQueue) -> Result<Reporter> {
        let mut reporter = Reporter::new();
        let workers = worker_count(self.options.workers, queue.len());
        if workers == 0 {
            debug!("Nothing to run");
            return Ok(reporter);
        }

        info!("Running {} tests on {} workers", queue.len(), workers);

        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let (tx, rx) = mpsc::channel(1);
            handles.push(tokio::spawn(worker(
                id,
                rx,
                result_tx.clone(),
                self.registry.clone(),
                self.options.clone(),
            )));
            senders.push(tx);
        }
        drop(result_tx);

        // Prime every worker with one item
        let mut in_flight = 0;
        for tx in &senders {
            if let Some(item) = queue.pop() {
                tx.send(Command::Run(item)).await?;
                in_flight += 1;
            }
        }

        while in_flight > 0 {
            let Some((id, partial)) = result_rx.recv().await else {
                bail!("workers stopped with {in_flight} tests outstanding");
            };
            in_flight -= 1;
            reporter.merge(partial);

            if let Some(item) = queue.pop() {
                debug!("Dispatching {} to worker {}", item, id);
                senders[id].send(Command::Run(item)).await?;
                in_flight += 1;
            }
        }

        for tx in &senders {
            let _ = tx.send(Command::Stop).await;
        }
        for (id, result) in join_all(handles).await.into_iter().enumerate() {
            if let Err(err) = result {
                warn!("Worker {} did not shut down cleanly: {}", id, err);
            }
        }

        Ok(reporter)
    }
}

async fn worker(
    id: usize,
    mut commands: mpsc::Receiver<Command>,
    results: mpsc::UnboundedSender<(usize, Reporter)>,
    registry: Arc<Registry>,
    options: Arc<Options>,
) {
    debug!("Worker {} started", id);

    while let Some(Command::Run(item)) = commands.recv().await {
        let registry = registry.clone();
        let options = options.clone();
        let label = item.to_string();

        // Tests are synchronous and may block for as long as they like
        let reporter = tokio::task::spawn_blocking(move || {
            runner::execute(&registry, &item, &options)
        })
        .await
        .unwrap_or_else(|err| {
            warn!("Worker {} lost {}: {}", id, label, err);
            Reporter::new()
        });

        if results.send((id, reporter)).is_err() {
            break;
        }
    }

    debug!("Worker {} stopped", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Test, TestCase, TestClass};
    use crate::error::Outcome;

    #[derive(Default)]
    struct Numbers;

    impl TestCase for Numbers {}

    impl Numbers {
        fn pass(&mut self, t: &mut Test) -> Outcome {
            t.expect(1).to_be_equal_to(1)?;
            Ok(())
        }

        fn fail(&mut self, t: &mut Test) -> Outcome {
            t.expect(1).to_be_equal_to(2)?;
            Ok(())
        }
    }

    fn registry(passing: usize, failing: usize) -> Arc<Registry> {
        let mut builder = TestClass::builder::<Numbers>("NumbersTest").in_file("tests/numbers.rs");
        for i in 0..passing {
            builder = builder.test_at(format!("test_pass_{i}"), i as u32 + 1, Numbers::pass);
        }
        for i in 0..failing {
            builder = builder.test_at(format!("test_fail_{i}"), 1000 + i as u32, Numbers::fail);
        }

        let mut registry = Registry::new();
        registry.register(builder.build());
        Arc::new(registry)
    }

    async fn run(registry: Arc<Registry>, workers: usize) -> Reporter {
        let options = Options {
            workers: Some(workers),
            ..Options::quiet()
        };
        let queue = WorkQueue::populate(&registry, None);
        ParallelExecutor::new(registry, options).run(queue).await.unwrap()
    }

    #[tokio::test]
    async fn test_totals_do_not_depend_on_worker_count() {
        for workers in [1, 3, 8] {
            let reporter = run(registry(20, 5), workers).await;
            assert_eq!(reporter.test_count(), 25);
            assert_eq!(reporter.expectation_count(), 25);
            assert_eq!(reporter.success_count(), 20);
            assert_eq!(reporter.failure_count(), 5);
            assert_eq!(reporter.failures().len(), 5);
            assert_eq!(reporter.exit_status(), 1);
        }
    }

    #[tokio::test]
    async fn test_empty_queue_spawns_nothing() {
        let reporter = run(Arc::new(Registry::new()), 4).await;
        assert_eq!(reporter.test_count(), 0);
        assert_eq!(reporter.exit_status(), 0);
    }

    #[tokio::test]
    async fn test_all_passing() {
        let reporter = run(registry(10, 0), 4).await;
        assert_eq!(reporter.success_count(), 10);
        assert_eq!(reporter.exit_status(), 0);
    }
}
