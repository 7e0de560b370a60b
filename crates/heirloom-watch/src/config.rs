//! Watchdog configuration: parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use heirloom_core::{HeartbeatConfig, Limits};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Polls closer together than this are refused.
pub const MIN_POLL_INTERVAL_SECS: u64 = 60;

/// Top-level watchdog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchdogConfig {
    #[serde(default)]
    pub watchdog: WatchdogSection,

    /// Check-in reminder thresholds
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Bounds and delays for the custodian this watchdog serves
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogSection {
    /// Identity the watchdog signs its triggers with
    #[serde(default = "default_watcher")]
    pub watcher: String,

    /// Watchdog bookkeeping (last poll, reminders sent)
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Where to write a JSON snapshot of the custody state after each poll
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Poll interval in seconds (default: 1 hour)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Log level (error, warn, info, debug, trace) for the host's logger
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            watcher: default_watcher(),
            state_path: default_state_path(),
            snapshot_path: None,
            poll_interval_secs: default_poll_interval(),
            log_level: default_log_level(),
        }
    }
}

fn default_watcher() -> String {
    "heirloom-watchdog".to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("watch_state.json")
}

fn default_poll_interval() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl WatchdogConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).with_context(|| "Failed to parse TOML config")
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `HEIRLOOM_WATCHER`
    /// - `HEIRLOOM_STATE_PATH`
    /// - `HEIRLOOM_SNAPSHOT_PATH`
    /// - `HEIRLOOM_POLL_INTERVAL`
    /// - `HEIRLOOM_LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HEIRLOOM_WATCHER") {
            self.watchdog.watcher = v;
        }
        if let Ok(v) = std::env::var("HEIRLOOM_STATE_PATH") {
            self.watchdog.state_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("HEIRLOOM_SNAPSHOT_PATH") {
            self.watchdog.snapshot_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("HEIRLOOM_POLL_INTERVAL") {
            match v.parse::<u64>() {
                Ok(secs) => self.watchdog.poll_interval_secs = secs,
                Err(_) => log::warn!("Ignoring non-numeric HEIRLOOM_POLL_INTERVAL={}", v),
            }
        }
        if let Ok(v) = std::env::var("HEIRLOOM_LOG_LEVEL") {
            self.watchdog.log_level = v;
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.watchdog.watcher.trim().is_empty(),
            "watchdog.watcher must not be empty"
        );
        anyhow::ensure!(
            self.watchdog.poll_interval_secs >= MIN_POLL_INTERVAL_SECS,
            "watchdog.poll_interval_secs must be >= {}",
            MIN_POLL_INTERVAL_SECS
        );
        self.heartbeat
            .validate()
            .context("Invalid [heartbeat] section")?;
        self.limits.validate().context("Invalid [limits] section")?;
        Ok(())
    }
}
