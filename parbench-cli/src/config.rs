//! Process-wide configuration.
//!
//! Resolution order: built-in defaults, then the nearest `parbench.toml`
//! found walking up from the current directory, then environment
//! overrides. Workers of one group inherit the launcher's environment, so
//! every rank resolves the same values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file the harness looks for.
pub const CONFIG_FILE_NAME: &str = "parbench.toml";

/// Environment override for [`GlobalConfig::max_time_sec`].
pub const ENV_MAX_TIME: &str = "PARBENCH_MAX_TIME";
/// Environment override for [`GlobalConfig::num_threads`].
pub const ENV_NUM_THREADS: &str = "PARBENCH_NUM_THREADS";

fn default_max_time() -> f64 {
    10.0
}

/// Process-wide harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Wall-clock ceiling per timed iteration, in seconds.
    #[serde(default = "default_max_time")]
    pub max_time_sec: f64,
    /// Cap applied to the global thread pool; `None` leaves the pool at
    /// its default width.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_time_sec: default_max_time(),
            num_threads: None,
        }
    }
}

impl GlobalConfig {
    /// Parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Find and parse the nearest `parbench.toml`, walking up from the
    /// current directory. `None` when no config file exists; parse errors
    /// are reported, not swallowed.
    pub fn discover() -> Result<Option<Self>> {
        let Ok(mut dir) = std::env::current_dir() else {
            return Ok(None);
        };
        loop {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
            if !dir.pop() {
                return Ok(None);
            }
        }
    }

    /// Apply environment overrides on top of this config. Unparsable
    /// values are ignored in favor of the file/default value.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var(ENV_MAX_TIME) {
            if let Ok(value) = raw.parse::<f64>() {
                self.max_time_sec = value;
            } else {
                tracing::warn!(%raw, "ignoring unparsable {ENV_MAX_TIME}");
            }
        }
        if let Ok(raw) = std::env::var(ENV_NUM_THREADS) {
            if let Ok(value) = raw.parse::<usize>() {
                self.num_threads = Some(value);
            } else {
                tracing::warn!(%raw, "ignoring unparsable {ENV_NUM_THREADS}");
            }
        }
        self
    }

    /// Full resolution: defaults, discovered file, environment.
    pub fn resolve() -> Result<Self> {
        Ok(Self::discover()?.unwrap_or_default().with_env_overrides())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.max_time_sec, 10.0);
        assert_eq!(config.num_threads, None);
    }

    #[test]
    fn file_values_override_defaults() {
        let config: GlobalConfig =
            toml::from_str("max_time_sec = 2.5\nnum_threads = 4\n").unwrap();
        assert_eq!(config.max_time_sec, 2.5);
        assert_eq!(config.num_threads, Some(4));
    }

    #[test]
    fn load_reports_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max_time_sec = \"soon\"").unwrap();
        assert!(GlobalConfig::load(&path).is_err());
    }

    // Environment mutation is process-global, so both overrides live in
    // one test.
    #[test]
    fn env_overrides_win() {
        std::env::set_var(ENV_MAX_TIME, "3.5");
        std::env::set_var(ENV_NUM_THREADS, "2");
        let config = GlobalConfig::default().with_env_overrides();
        std::env::remove_var(ENV_MAX_TIME);
        std::env::remove_var(ENV_NUM_THREADS);
        assert_eq!(config.max_time_sec, 3.5);
        assert_eq!(config.num_threads, Some(2));
    }
}
