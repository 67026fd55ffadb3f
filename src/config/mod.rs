//! Configuration module
//!
//! Handles loading configuration files, environment overrides and the
//! resolved runtime options the engine consumes.

mod env;
mod file;

pub use env::EnvConfig;
pub use file::ConfigFile;

use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::warn;

use crate::output::{Color, OutputFormat};

/// How workers are isolated from each other
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Worker tasks inside this process
    #[default]
    Threads,
    /// Worker processes talking to a queue server over a local socket
    Processes,
}

impl Strategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "threads" | "thread" | "ractor" => Some(Strategy::Threads),
            "processes" | "process" => Some(Strategy::Processes),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Threads => "threads",
            Strategy::Processes => "processes",
        }
    }
}

/// Application configuration as stored in a config file
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Colorize output
    pub color: bool,

    /// Use the interactive pager when stdout is a terminal
    pub interactive: bool,

    /// Editor used by the pager to open failures
    pub editor: Option<String>,

    /// Worker isolation strategy
    pub strategy: Strategy,

    /// Upper bound on workers (defaults to hardware parallelism)
    pub workers: Option<usize>,

    /// Summary output format
    pub format: OutputFormat,

    /// Shuffle seed, for reproducing an execution order
    pub seed: Option<u64>,

    /// Command the pager runs to rerun a single test, e.g.
    /// `["cargo", "run", "--quiet", "--"]`
    pub rerun_command: Option<Vec<String>>,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            color: true,
            interactive: true,
            editor: None,
            strategy: Strategy::Threads,
            workers: None,
            format: OutputFormat::Plain,
            seed: None,
            rerun_command: None,
            log_level: "warn".to_string(),
        }
    }
}

/// Resolved runtime options
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Options {
    pub color: bool,
    pub interactive: bool,
    pub editor: Option<String>,
    pub strategy: Strategy,
    pub workers: Option<usize>,
    pub format: OutputFormat,
    pub seed: Option<u64>,
    pub rerun_command: Option<Vec<String>>,

    /// Program spawned for process workers; the current executable if unset
    pub worker_program: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl Options {
    /// Options from a config file, before environment and CLI overrides
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            color: config.color,
            interactive: config.interactive,
            editor: config.editor.clone(),
            strategy: config.strategy,
            workers: config.workers,
            format: config.format,
            seed: config.seed,
            rerun_command: config.rerun_command.clone(),
            worker_program: None,
        }
    }

    /// Apply `LOUPE_*` overrides, falling back to `$EDITOR` for the editor
    pub fn apply_env(mut self, env: &EnvConfig) -> Self {
        if let Some(color) = env.color {
            self.color = color;
        }
        if let Some(interactive) = env.interactive {
            self.interactive = interactive;
        }
        match env.workers {
            Some(0) => warn!("Ignoring LOUPE_WORKERS=0: at least one worker is needed"),
            Some(workers) => self.workers = Some(workers),
            None => {}
        }
        if let Some(strategy) = env.strategy.as_deref().and_then(Strategy::from_str) {
            self.strategy = strategy;
        }
        if let Some(seed) = env.seed {
            self.seed = Some(seed);
        }
        if env.editor.is_some() {
            self.editor = env.editor.clone();
        } else if self.editor.is_none() {
            self.editor = env.fallback_editor.clone();
        }
        self
    }

    /// Options for a silent, colorless run (library use and tests)
    pub fn quiet() -> Self {
        Self {
            color: false,
            interactive: false,
            format: OutputFormat::Json,
            ..Self::default()
        }
    }

    pub fn color(&self) -> Color {
        Color::new(self.color)
    }

    /// Progress glyphs are only printed for plain-text output
    pub fn progress(&self) -> bool {
        self.format == OutputFormat::Plain
    }

    /// The pager needs a terminal on both ends
    pub fn use_pager(&self) -> bool {
        self.interactive
            && self.format == OutputFormat::Plain
            && std::io::stdout().is_terminal()
            && std::io::stdin().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.color);
        assert!(config.interactive);
        assert_eq!(config.strategy, Strategy::Threads);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(Strategy::from_str("Processes"), Some(Strategy::Processes));
        assert_eq!(Strategy::from_str("threads"), Some(Strategy::Threads));
        assert_eq!(Strategy::from_str("fibers"), None);
    }

    #[test]
    fn test_env_overrides() {
        let env = EnvConfig {
            color: Some(false),
            workers: Some(2),
            strategy: Some("processes".to_string()),
            fallback_editor: Some("nvim".to_string()),
            ..Default::default()
        };

        let options = Options::default().apply_env(&env);
        assert!(!options.color);
        assert_eq!(options.workers, Some(2));
        assert_eq!(options.strategy, Strategy::Processes);
        assert_eq!(options.editor.as_deref(), Some("nvim"));
    }

    #[test]
    fn test_env_zero_workers_is_ignored() {
        let env = EnvConfig {
            workers: Some(0),
            ..Default::default()
        };
        let config = AppConfig {
            workers: Some(3),
            ..Default::default()
        };

        assert_eq!(Options::default().apply_env(&env).workers, None);
        assert_eq!(Options::from_config(&config).apply_env(&env).workers, Some(3));
    }

    #[test]
    fn test_quiet_options_have_no_progress() {
        let options = Options::quiet();
        assert!(!options.progress());
        assert!(!options.use_pager());
        assert!(!options.color().is_enabled());
    }
}
