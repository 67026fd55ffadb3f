//! CLI argument parsing
//!
//! Defines the command-line interface using clap and drives one run from
//! parsed arguments to an exit status.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::case::{Registry, Selector};
use crate::config::{AppConfig, ConfigFile, EnvConfig, Options, Strategy};
use crate::executor::{self, WorkItem};
use crate::models::Reporter;
use crate::output::{CommandRerunner, OutputFormat, Pager, SummaryFormatter};
use crate::utils::{init_logger, LogLevel, Timer};

/// Parallel test runner with an interactive failure pager
#[derive(Parser, Debug)]
#[command(name = "loupe")]
#[command(version)]
#[command(about = "Run registered test classes in parallel and page through failures")]
#[command(long_about = None)]
pub struct Args {
    /// Test files to run, optionally as `path:line`
    pub files: Vec<String>,

    /// Force colored output
    #[arg(long, overrides_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Page through failures after the run
    #[arg(short, long, overrides_with = "plain")]
    pub interactive: bool,

    /// Print a plain summary instead of paging
    #[arg(short, long)]
    pub plain: bool,

    /// Editor the pager opens failures in
    #[arg(short, long)]
    pub editor: Option<String>,

    /// Run tests in worker processes instead of worker tasks
    #[arg(long)]
    pub processes: bool,

    /// Maximum number of workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Shuffle seed, to reproduce an execution order
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Summary format (plain, json)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// List registered test classes and exit
    #[arg(short, long)]
    pub list: bool,

    /// Serve as a worker for the queue at this socket
    #[arg(long, hide = true)]
    pub worker: Option<PathBuf>,

    /// Run a single `Class::method` and print its JSON report
    #[arg(long, hide = true)]
    pub only: Option<String>,
}

impl Args {
    /// The config file named by `--config` or `LOUPE_CONFIG`, else the
    /// first one found in the standard locations
    pub fn config(&self, env: &EnvConfig) -> Result<ConfigFile> {
        let path = self
            .config
            .clone()
            .or_else(|| env.config_file.as_ref().map(PathBuf::from));
        match path {
            Some(path) => ConfigFile::load(path),
            None => ConfigFile::load_default(),
        }
    }

    /// Resolve options: config file, then `LOUPE_*`, then flags
    pub fn options(&self, env: &EnvConfig, config: &ConfigFile) -> Result<Options> {
        if env.has_any() {
            debug!("Applying LOUPE_* environment overrides");
        }
        let mut options = Options::from_config(&config.app).apply_env(env);

        if self.color {
            options.color = true;
        }
        if self.no_color {
            options.color = false;
        }
        if self.interactive {
            options.interactive = true;
        }
        if self.plain {
            options.interactive = false;
        }
        if self.editor.is_some() {
            options.editor = self.editor.clone();
        }
        if self.processes {
            options.strategy = Strategy::Processes;
        }
        if let Some(workers) = self.workers {
            anyhow::ensure!(workers > 0, "--workers must be at least 1");
            options.workers = Some(workers);
        }
        if self.seed.is_some() {
            options.seed = self.seed;
        }
        if let Some(format) = &self.format {
            options.format = OutputFormat::from_str(format)
                .ok_or_else(|| anyhow::anyhow!("Unknown format: {format}"))?;
        }

        Ok(options)
    }

    /// `--verbose`, then a level name in `LOUPE_LOG`, then the config file
    fn log_level(&self, env: &EnvConfig, config: &AppConfig) -> LogLevel {
        if self.verbose {
            return LogLevel::Debug;
        }
        env.log
            .as_deref()
            .and_then(LogLevel::from_str)
            .or_else(|| LogLevel::from_str(&config.log_level))
            .unwrap_or(LogLevel::Warn)
    }

    fn selectors(&self) -> Result<Vec<Selector>> {
        self.files
            .iter()
            .map(|file| file.parse::<Selector>().map_err(Into::into))
            .collect()
    }
}

/// Execute one invocation and return the process exit status
pub async fn run(args: Args, mut registry: Registry) -> Result<i32> {
    let env = EnvConfig::load();
    // A level name in LOUPE_LOG is handled by `log_level`; anything else is
    // a filter directive
    let directive = env
        .log
        .as_deref()
        .filter(|log| LogLevel::from_str(log).is_none());
    let config = args.config(&env)?;
    init_logger(args.log_level(&env, &config.app), directive);

    let options = args.options(&env, &config)?;
    debug!("Resolved options: {:?}", options);

    if let Some(socket) = args.worker.clone() {
        tokio::task::spawn_blocking(move || executor::run_worker(&socket, &registry, &options))
            .await
            .context("Worker task failed")??;
        return Ok(0);
    }

    if let Some(only) = &args.only {
        return run_only(only, &registry, options);
    }

    if args.list {
        list_classes(&registry);
        return Ok(0);
    }

    registry.select(&args.selectors()?);
    let (reporter, timer) = executor::run(Arc::new(registry), &options).await?;

    if options.use_pager() && reporter.failure_count() > 0 {
        info!("Opening pager for {} failures", reporter.failure_count());
        let rerunner = CommandRerunner::new(options.rerun_command.clone())?;
        let pager = Pager::new(
            reporter,
            timer.elapsed_secs(),
            options.color(),
            options.editor.clone(),
            Box::new(rerunner),
        );
        let reporter = tokio::task::spawn_blocking(move || pager.run())
            .await
            .context("Pager task failed")??;
        return Ok(reporter.exit_status());
    }

    SummaryFormatter::new(options.format).write_summary(&mut io::stdout(), &reporter, &timer)?;
    Ok(reporter.exit_status())
}

fn run_only(only: &str, registry: &Registry, mut options: Options) -> Result<i32> {
    let item: WorkItem = only.parse()?;
    options.format = OutputFormat::Json;

    let timer = Timer::start(only);
    let reporter = executor::execute(registry, &item, &options);
    write_only_report(&mut io::stdout(), &reporter, &timer)?;
    Ok(reporter.exit_status())
}

/// The report goes on a line of its own after whatever the test printed
fn write_only_report(out: &mut impl Write, reporter: &Reporter, timer: &Timer) -> Result<()> {
    out.write_all(b"\n")?;
    SummaryFormatter::new(OutputFormat::Json).write_summary(out, reporter, timer)
}

fn list_classes(registry: &Registry) {
    for (class, _) in registry.classes() {
        println!("{} ({})", class.name(), class.file());
        for method in class.test_list() {
            println!("  {:40} line {}", method.name(), method.line());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from([
            "loupe",
            "tests/smoke.rs:12",
            "tests/other.rs",
            "--plain",
            "--workers",
            "3",
            "--seed",
            "42",
        ]);
        assert_eq!(args.files, vec!["tests/smoke.rs:12", "tests/other.rs"]);
        assert!(args.plain);
        assert_eq!(args.workers, Some(3));
        assert_eq!(args.seed, Some(42));

        let selectors = args.selectors().unwrap();
        assert_eq!(selectors[0].line, Some(12));
        assert_eq!(selectors[1].line, None);
    }

    #[test]
    fn test_hidden_worker_flags() {
        let args = Args::parse_from([
            "loupe",
            "--worker",
            "/tmp/loupe.sock",
            "--no-color",
            "--format",
            "json",
        ]);
        assert_eq!(args.worker, Some(PathBuf::from("/tmp/loupe.sock")));
        assert!(args.no_color);

        let args = Args::parse_from(["loupe", "--only", "SmokeTest::test_a"]);
        assert_eq!(args.only.as_deref(), Some("SmokeTest::test_a"));
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("loupe.yaml");
        std::fs::write(
            &path,
            "version: \"1.0\"\napp:\n  color: true\n  workers: 8\n  editor: vim\n",
        )
        .unwrap();

        let args = Args::parse_from([
            "loupe",
            "--config",
            path.to_str().unwrap(),
            "--no-color",
            "--processes",
            "--format",
            "json",
            "-w",
            "2",
        ]);
        let env = EnvConfig::default();
        let options = args.options(&env, &args.config(&env).unwrap()).unwrap();
        assert!(!options.color);
        assert_eq!(options.workers, Some(2));
        assert_eq!(options.strategy, Strategy::Processes);
        assert_eq!(options.format, OutputFormat::Json);
        assert_eq!(options.editor.as_deref(), Some("vim"));
    }

    #[test]
    fn test_invalid_flags() {
        let args = Args::parse_from(["loupe", "--format", "table"]);
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("loupe.json");
        std::fs::write(&path, "{}").unwrap();
        let env = EnvConfig {
            config_file: Some(path.display().to_string()),
            ..Default::default()
        };
        let config = args.config(&env).unwrap();
        assert!(args.options(&env, &config).is_err());
        assert!(Args::parse_from(["loupe", "tests/a.rs:"]).selectors().is_err());
    }

    #[test]
    fn test_log_level() {
        let defaults = AppConfig::default();
        let args = Args::parse_from(["loupe", "-v"]);
        assert_eq!(args.log_level(&EnvConfig::default(), &defaults), LogLevel::Debug);

        let args = Args::parse_from(["loupe"]);
        let env = EnvConfig {
            log: Some("info".to_string()),
            ..Default::default()
        };
        assert_eq!(args.log_level(&env, &defaults), LogLevel::Info);
        assert_eq!(args.log_level(&EnvConfig::default(), &defaults), LogLevel::Warn);
    }

    #[test]
    fn test_log_level_from_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("loupe.yaml");
        std::fs::write(&path, "app:\n  log_level: debug\n").unwrap();

        let args = Args::parse_from(["loupe", "--config", path.to_str().unwrap()]);
        let config = args.config(&EnvConfig::default()).unwrap();
        assert_eq!(args.log_level(&EnvConfig::default(), &config.app), LogLevel::Debug);

        // LOUPE_LOG still wins over the file
        let env = EnvConfig {
            log: Some("error".to_string()),
            ..Default::default()
        };
        assert_eq!(args.log_level(&env, &config.app), LogLevel::Error);
    }

    #[test]
    fn test_only_report_follows_unterminated_output() {
        let mut reporter = Reporter::new();
        reporter.increment_test_count();
        reporter.increment_success_count();

        let mut stdout = b"printed without a newline".to_vec();
        write_only_report(&mut stdout, &reporter, &Timer::start("only")).unwrap();

        let parsed = crate::output::pager::parse_rerun_output(&stdout).unwrap();
        assert_eq!(parsed.test_count(), 1);
        assert_eq!(parsed.success_count(), 1);
    }
}
