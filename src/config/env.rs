//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "LOUPE";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Color from LOUPE_COLOR
    pub color: Option<bool>,
    /// Pager from LOUPE_INTERACTIVE
    pub interactive: Option<bool>,
    /// Editor from LOUPE_EDITOR
    pub editor: Option<String>,
    /// Editor from EDITOR, used when nothing else names one
    pub fallback_editor: Option<String>,
    /// Worker cap from LOUPE_WORKERS
    pub workers: Option<usize>,
    /// Strategy from LOUPE_STRATEGY
    pub strategy: Option<String>,
    /// Shuffle seed from LOUPE_SEED
    pub seed: Option<u64>,
    /// Config file from LOUPE_CONFIG
    pub config_file: Option<String>,
    /// Log filter from LOUPE_LOG
    pub log: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            color: get_env_bool("COLOR"),
            interactive: get_env_bool("INTERACTIVE"),
            editor: get_env("EDITOR"),
            fallback_editor: env::var("EDITOR").ok().filter(|e| !e.is_empty()),
            workers: get_env_parse("WORKERS"),
            strategy: get_env("STRATEGY"),
            seed: get_env_parse("SEED"),
            config_file: get_env("CONFIG"),
            log: get_env("LOG"),
        }
    }

    /// Check if any LOUPE_ variables are set
    pub fn has_any(&self) -> bool {
        self.color.is_some()
            || self.interactive.is_some()
            || self.editor.is_some()
            || self.workers.is_some()
            || self.strategy.is_some()
            || self.seed.is_some()
            || self.config_file.is_some()
            || self.log.is_some()
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sets `LOUPE_*` variables and restores the previous values on drop
    struct EnvGuard {
        previous: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&str, &str)]) -> Self {
            let previous = vars
                .iter()
                .map(|(name, value)| {
                    let key = format!("{ENV_PREFIX}_{name}");
                    let old = env::var(&key).ok();
                    env::set_var(&key, value);
                    (key, old)
                })
                .collect();
            Self { previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.previous {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.color.is_none());
        assert!(!config.has_any());
    }

    #[test]
    fn test_load_reads_prefixed_variables() {
        let _guard = EnvGuard::set(&[("COLOR", "false"), ("WORKERS", "3"), ("SEED", "42")]);

        let config = EnvConfig::load();
        assert_eq!(config.color, Some(false));
        assert_eq!(config.workers, Some(3));
        assert_eq!(config.seed, Some(42));
        assert!(config.has_any());
    }
}
