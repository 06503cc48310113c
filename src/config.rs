use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Application-level configuration.
///
/// Per-strategy policy lives in `strategy.json` documents under the data
/// root (see `strategy::schema`); this struct only covers process-level
/// settings shared by every command.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root directory for all durable artifacts (strategies, state, locks,
    /// run logs).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub watchdog: WatchdogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogSettings {
    /// Seconds since the last successful tick before a strategy is
    /// considered stale.
    #[serde(default = "default_max_stale_sec")]
    pub max_stale_sec: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            max_stale_sec: default_max_stale_sec(),
        }
    }
}

fn default_max_stale_sec() -> u64 {
    180
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mintrunner")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            watchdog: WatchdogSettings::default(),
        }
    }
}

impl AppConfig {
    /// Repository rooted at the configured data directory.
    pub fn repository(&self) -> crate::persistence::StrategyRepository {
        crate::persistence::StrategyRepository::open(&self.data_dir)
    }

    /// Watchdog thresholds from the configured settings.
    pub fn watchdog_config(&self) -> crate::supervisor::WatchdogConfig {
        crate::supervisor::WatchdogConfig {
            max_stale_sec: self.watchdog.max_stale_sec,
        }
    }

    /// Load configuration from an optional file plus `MINTRUNNER_*`
    /// environment overrides (e.g. `MINTRUNNER_DATA_DIR`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::with_prefix("MINTRUNNER").separator("__"));

        let cfg = builder.build()?;

        // An empty source set is fine; fall back to defaults field by field.
        match cfg.try_deserialize::<AppConfig>() {
            Ok(parsed) => Ok(parsed),
            Err(_) if path.is_none() => Ok(AppConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_watchdog_threshold() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.watchdog.max_stale_sec, 180);
        assert!(cfg.data_dir.ends_with("mintrunner"));
    }
}
