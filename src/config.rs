//! Configuration types for the occupancy collector.

use crate::occupancy::DEFAULT_LEVELS;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level collector configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Endpoint polling settings.
    pub fetch: FetchConfig,
    /// Active CSV log settings.
    pub log: LogConfig,
    /// Weekly rotation schedule.
    pub rotation: RotationConfig,
}

/// Endpoint polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Occupancy endpoint (must return JSON with the affluence breakdown).
    pub url: String,
    /// Value sent in the `User-Agent` header.
    pub user_agent: String,
    /// Seconds between fetches.
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: "https://apps.dur.ac.uk/study-spaces/library/bill-bryson/occupancy/display?json&affluence"
                .to_owned(),
            user_agent: "oli-bot/1.0 (+https://oli.mcinnes.cc)".to_owned(),
            poll_interval_secs: 30,
            timeout_secs: 20,
        }
    }
}

impl FetchConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Active log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Path of the active CSV file. Archives are written next to it.
    pub path: PathBuf,
    /// Sub-area names written as columns, in order.
    pub levels: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs").join("occupancy.csv"),
            levels: DEFAULT_LEVELS.iter().map(|l| (*l).to_owned()).collect(),
        }
    }
}

/// When the weekly rotation fires (local time).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Day of week, e.g. `"Mon"` or `"monday"`.
    pub weekday: Weekday,
    /// Hour of day (0-23).
    pub hour: u8,
    /// Minute of hour (0-59).
    pub minute: u8,
    /// Second of minute (0-59).
    pub second: u8,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            weekday: Weekday::Mon,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl CollectorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails [`validate`](Self::validate).
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::CollectorError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| crate::error::CollectorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CollectorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: String| Err(crate::error::CollectorError::Config(msg));

        if self.fetch.url.trim().is_empty() {
            return invalid("fetch.url must not be empty".to_owned());
        }
        if self.fetch.poll_interval_secs == 0 {
            return invalid("fetch.poll_interval_secs must be > 0".to_owned());
        }
        if self.fetch.timeout_secs == 0 {
            return invalid("fetch.timeout_secs must be > 0".to_owned());
        }
        if self.log.path.as_os_str().is_empty() {
            return invalid("log.path must not be empty".to_owned());
        }

        let mut seen = HashSet::new();
        for level in &self.log.levels {
            if level.trim().is_empty() {
                return invalid("log.levels must not contain empty names".to_owned());
            }
            if !seen.insert(level.as_str()) {
                return invalid(format!("log.levels contains duplicate '{level}'"));
            }
        }

        let r = &self.rotation;
        if r.hour > 23 || r.minute > 59 || r.second > 59 {
            return invalid(format!(
                "rotation time {:02}:{:02}:{:02} is out of range",
                r.hour, r.minute, r.second
            ));
        }
        Ok(())
    }
}
