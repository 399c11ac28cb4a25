//! Configuration loading and management
//!
//! Handles parsing of the board's `config.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::ColumnType;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task creation rules
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Persistence loop settings
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Refresh cadence of the live board
    #[serde(default)]
    pub ticks: TicksConfig,

    /// Progress colour thresholds
    #[serde(default)]
    pub urgency: UrgencyConfig,

    /// Column titles used for fresh boards
    #[serde(default)]
    pub columns: ColumnsConfig,
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Shortest accepted task text, in characters
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,
}

fn default_min_text_len() -> usize {
    5
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            min_text_len: default_min_text_len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Quiet period after the last mutation before the state is written
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Key the state blob is stored under
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

/// Longest accepted debounce or tick interval: one day.
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

fn default_debounce_ms() -> u64 {
    500
}

fn default_storage_key() -> String {
    "todoTasks".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            storage_key: default_storage_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicksConfig {
    /// Time-left labels and the day-boundary check
    #[serde(default = "default_time_left_ms")]
    pub time_left_ms: u64,

    /// Cached deadline progress
    #[serde(default = "default_progress_ms")]
    pub progress_ms: u64,
}

fn default_time_left_ms() -> u64 {
    1000
}

fn default_progress_ms() -> u64 {
    60_000
}

impl Default for TicksConfig {
    fn default() -> Self {
        Self {
            time_left_ms: default_time_left_ms(),
            progress_ms: default_progress_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyConfig {
    /// Progress strictly above this is relaxed (green)
    #[serde(default = "default_relaxed_above")]
    pub relaxed_above: f64,

    /// Progress strictly below this is urgent (red)
    #[serde(default = "default_urgent_below")]
    pub urgent_below: f64,
}

fn default_relaxed_above() -> f64 {
    70.0
}

fn default_urgent_below() -> f64 {
    30.0
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            relaxed_above: default_relaxed_above(),
            urgent_below: default_urgent_below(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default = "default_short_title")]
    pub short: String,
    #[serde(default = "default_medium_title")]
    pub medium: String,
    #[serde(default = "default_long_title")]
    pub long: String,
    #[serde(default = "default_daily_title")]
    pub daily: String,
}

fn default_short_title() -> String {
    "Short tasks".to_string()
}

fn default_medium_title() -> String {
    "Medium tasks".to_string()
}

fn default_long_title() -> String {
    "Long tasks".to_string()
}

fn default_daily_title() -> String {
    "Daily".to_string()
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            short: default_short_title(),
            medium: default_medium_title(),
            long: default_long_title(),
            daily: default_daily_title(),
        }
    }
}

impl ColumnsConfig {
    pub fn title_for(&self, kind: ColumnType) -> &str {
        match kind {
            ColumnType::Short => &self.short,
            ColumnType::Medium => &self.medium,
            ColumnType::Long => &self.long,
            ColumnType::Daily => &self.daily,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the data directory's `config.toml`, or return defaults
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring unusable config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: &str| Err(crate::error::Error::InvalidConfig(msg.to_string()));

        if self.tasks.min_text_len == 0 {
            return invalid("tasks.min_text_len must be >= 1");
        }
        if self.persistence.storage_key.trim().is_empty() {
            return invalid("persistence.storage_key cannot be empty");
        }
        if self.ticks.time_left_ms == 0 || self.ticks.progress_ms == 0 {
            return invalid("ticks intervals must be > 0");
        }
        let intervals = [
            ("persistence.debounce_ms", self.persistence.debounce_ms),
            ("ticks.time_left_ms", self.ticks.time_left_ms),
            ("ticks.progress_ms", self.ticks.progress_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms > MAX_INTERVAL_MS) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "{name} must be <= {MAX_INTERVAL_MS}"
            )));
        }

        let UrgencyConfig {
            relaxed_above,
            urgent_below,
        } = self.urgency;
        if !(0.0..=100.0).contains(&relaxed_above) || !(0.0..=100.0).contains(&urgent_below) {
            return invalid("urgency thresholds must be within 0..=100");
        }
        if urgent_below > relaxed_above {
            return invalid("urgency.urgent_below cannot exceed urgency.relaxed_above");
        }

        for kind in ColumnType::ALL {
            if self.columns.title_for(kind).trim().is_empty() {
                return Err(crate::error::Error::InvalidConfig(format!(
                    "columns.{kind} title cannot be empty"
                )));
            }
        }
        Ok(())
    }
}
