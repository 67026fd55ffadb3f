//! Process-based parallel execution
//!
//! The controller serves the queue over a local socket and spawns worker
//! processes (normally the same binary with `--worker <socket>`). Each
//! worker pulls items until the queue is drained and pushes back one
//! partial reporter per test.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::case::Registry;
use crate::config::Options;
use crate::models::Reporter;

use super::WorkQueue;

/// Process-based executor
pub struct ProcessExecutor {
    registry: Arc<Registry>,
    options: Options,
}

impl ProcessExecutor {
    /// `registry` only describes leftover items; the workers run their own
    pub fn new(registry: Arc<Registry>, options: Options) -> Self {
        Self { registry, options }
    }

    /// Flags a worker process needs to report the way the controller does
    fn worker_args(&self) -> Vec<&'static str> {
        let color = if self.options.color { "--color" } else { "--no-color" };
        vec![color, "--plain", "--format", self.options.format.name()]
    }
}

#[cfg(unix)]
mod imp {
    use super::*;
    use anyhow::Context;
    use futures::future::join_all;
    use tracing::{debug, info, warn};

    use crate::executor::protocol::Client;
    use crate::executor::server::QueueServer;
    use crate::executor::{runner, worker_count};
    use crate::error::LoupeError;

    impl ProcessExecutor {
        /// Drain `queue` through worker processes and return the merged
        /// reporter
        pub async fn run(&self, queue: WorkQueue) -> Result<Reporter> {
            let workers = worker_count(self.options.workers, queue.len());
            if workers == 0 {
                debug!("Nothing to run");
                return Ok(Reporter::new());
            }

            let program = match &self.options.worker_program {
                Some(program) => program.clone(),
                None => std::env::current_exe().context("Failed to locate current executable")?,
            };

            let server = QueueServer::bind(QueueServer::socket_path(), queue).await?;
            info!("Spawning {} worker processes", workers);

            let mut children = Vec::with_capacity(workers);
            for id in 0..workers {
                let child = tokio::process::Command::new(&program)
                    .arg("--worker")
                    .arg(server.path())
                    .args(self.worker_args())
                    .kill_on_drop(true)
                    .spawn()
                    .with_context(|| format!("Failed to spawn worker {}", program.display()))?;
                debug!("Worker {} started as pid {:?}", id, child.id());
                children.push(child);
            }

            let statuses = join_all(children.iter_mut().map(|child| child.wait())).await;
            let mut exit = None;
            for (id, status) in statuses.into_iter().enumerate() {
                match status {
                    Ok(status) if status.success() => debug!("Worker {} exited", id),
                    Ok(status) => {
                        warn!("Worker {} exited with {}; its current test is lost", id, status);
                        exit.get_or_insert_with(|| format!("worker exited with {status}"));
                    }
                    Err(err) => {
                        warn!("Failed to wait for worker {}: {}", id, err);
                        exit.get_or_insert_with(|| format!("worker was lost: {err}"));
                    }
                }
            }

            let (mut reporter, mut leftover) = server.finish().await?;
            if !leftover.is_empty() {
                let reason = exit.unwrap_or_else(|| "workers stopped early".to_string());
                warn!("{} tests were never run: {}", leftover.len(), reason);
                while let Some(item) = leftover.pop() {
                    reporter.merge(runner::crashed(
                        &self.registry,
                        &item,
                        &self.options,
                        format!("not run: {reason}"),
                    ));
                }
            }
            Ok(reporter)
        }
    }

    /// Worker process loop: pull, run, report, until the queue is drained
    pub fn run_worker(socket: &Path, registry: &Registry, options: &Options) -> Result<(), LoupeError> {
        let mut client = Client::connect(socket)?;

        loop {
            if client.is_empty()? {
                break;
            }
            let Some(item) = client.pop()? else {
                break;
            };
            let reporter = runner::execute(registry, &item, options);
            client.add_reporter(reporter)?;
        }

        debug!("Worker {} finished", std::process::id());
        Ok(())
    }
}

#[cfg(unix)]
pub use imp::run_worker;

#[cfg(not(unix))]
mod imp {
    use super::*;
    use crate::error::LoupeError;

    impl ProcessExecutor {
        pub async fn run(&self, _queue: WorkQueue) -> Result<Reporter> {
            Err(LoupeError::UnsupportedStrategy("processes").into())
        }
    }

    pub fn run_worker(_socket: &Path, _registry: &Registry, _options: &Options) -> Result<(), LoupeError> {
        Err(LoupeError::UnsupportedStrategy("processes"))
    }
}

#[cfg(not(unix))]
pub use imp::run_worker;

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::case::{Test, TestCase, TestClass};
    use crate::error::Outcome;
    use crate::executor::server::QueueServer;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Fixture;

    impl TestCase for Fixture {}

    fn pass(_: &mut Fixture, t: &mut Test) -> Outcome {
        t.expect(true).to_be_truthy()?;
        Ok(())
    }

    fn fail(_: &mut Fixture, t: &mut Test) -> Outcome {
        t.expect(Vec::<u8>::new()).to_not_be_empty()?;
        Ok(())
    }

    #[test]
    fn test_worker_args() {
        let executor = ProcessExecutor::new(Arc::new(Registry::new()), Options::quiet());
        assert_eq!(executor.worker_args(), vec!["--no-color", "--plain", "--format", "json"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_workers_share_one_queue() {
        let mut registry = Registry::new();
        registry.register(
            TestClass::builder::<Fixture>("FixtureTest")
                .test_at("test_one", 1, pass)
                .test_at("test_two", 2, pass)
                .test_at("test_three", 3, fail)
                .build(),
        );
        let registry = Arc::new(registry);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.sock");
        let queue = WorkQueue::populate(&registry, Some(1));
        let server = QueueServer::bind(path.clone(), queue).await.unwrap();

        // Two in-process stand-ins for worker processes
        let workers: Vec<_> = (0..2)
            .map(|_| {
                let registry = registry.clone();
                let path = path.clone();
                tokio::task::spawn_blocking(move || {
                    run_worker(&path, &registry, &Options::quiet())
                })
            })
            .collect();
        for worker in futures::future::join_all(workers).await {
            worker.unwrap().unwrap();
        }

        let (reporter, leftover) = server.finish().await.unwrap();
        assert!(leftover.is_empty());
        assert_eq!(reporter.test_count(), 3);
        assert_eq!(reporter.success_count(), 2);
        assert_eq!(reporter.failure_count(), 1);
        assert_eq!(reporter.failures()[0].test_name, "test_three");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dead_workers_leave_failed_tests() {
        let mut registry = Registry::new();
        registry.register(
            TestClass::builder::<Fixture>("FixtureTest")
                .test_at("test_one", 1, pass)
                .test_at("test_two", 2, pass)
                .build(),
        );
        let registry = Arc::new(registry);
        let options = Options {
            workers: Some(2),
            worker_program: Some("/bin/false".into()),
            ..Options::quiet()
        };

        let queue = WorkQueue::populate(&registry, None);
        let reporter = ProcessExecutor::new(registry, options)
            .run(queue)
            .await
            .unwrap();

        assert_eq!(reporter.test_count(), 2);
        assert_eq!(reporter.success_count(), 0);
        assert_eq!(reporter.failure_count(), 2);
        assert_eq!(reporter.exit_status(), 1);
        let failure = &reporter.failures()[0];
        assert!(failure.message.starts_with("not run: worker exited with"));
        assert_eq!(failure.class_name, "FixtureTest");
    }
}
