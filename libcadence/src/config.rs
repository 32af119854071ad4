//! Configuration management for Cadence

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: AccountConfig,
    pub collection: CollectionParams,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// CSV file holding the handle and API keys
    pub credentials_file: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            credentials_file: "~/.config/cadence/access_info.txt".to_string(),
        }
    }
}

/// Calls per window on the tightest endpoint, `followers/list`
pub const MAX_SAFETY_THRESHOLD: u32 = 15;

/// Knobs for the per-follower paging loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionParams {
    pub lookback_days: u32,
    /// Volume cap is `lookback_days * max_posts_per_day`
    pub max_posts_per_day: u32,
    pub page_size: u32,
    /// Minimum calls left before the tracker waits for a reset
    pub safety_threshold: u32,
    /// Extra seconds slept past each reset time
    pub margin_secs: u64,
    /// Pages with this many posts or fewer reject the follower
    pub min_page_size: usize,
    pub max_followers: usize,
}

impl Default for CollectionParams {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            max_posts_per_day: 50,
            page_size: 200,
            safety_threshold: 5,
            margin_secs: 10,
            min_page_size: 2,
            max_followers: 200,
        }
    }
}

impl CollectionParams {
    /// Most posts a follower may have inside the lookback window
    pub fn cap(&self) -> usize {
        self.lookback_days as usize * self.max_posts_per_day as usize
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.lookback_days))
    }

    pub fn margin(&self) -> Duration {
        Duration::from_secs(self.margin_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("collection.lookback_days", self.lookback_days as usize),
            ("collection.max_posts_per_day", self.max_posts_per_day as usize),
            ("collection.page_size", self.page_size as usize),
            ("collection.max_followers", self.max_followers),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }
        if self.safety_threshold > MAX_SAFETY_THRESHOLD {
            return Err(invalid(
                "collection.safety_threshold",
                &format!("must be at most {}", MAX_SAFETY_THRESHOLD),
            ));
        }
        Ok(())
    }
}

/// Serialization used for the corpus table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Csv,
    Jsonl,
}

impl TableFormat {
    /// Guess the format from a file extension, defaulting to CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") => TableFormat::Jsonl,
            _ => TableFormat::Csv,
        }
    }
}

impl std::str::FromStr for TableFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "jsonl" => Ok(TableFormat::Jsonl),
            _ => Err(ConfigError::Invalid {
                field: "output.format".to_string(),
                reason: format!("unknown table format '{}', expected csv or jsonl", s),
            }),
        }
    }
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableFormat::Csv => write!(f, "csv"),
            TableFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub format: TableFormat,
    /// Offset applied before deriving weekday and hour
    pub utc_offset_hours: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/cadence/corpus.csv".to_string(),
            format: TableFormat::Csv,
            utc_offset_hours: 0,
        }
    }
}

impl OutputConfig {
    pub fn utc_offset(&self) -> Result<chrono::FixedOffset> {
        chrono::FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| invalid("output.utc_offset_hours", "must be between -23 and 23"))
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file at the default location yields the defaults; a missing
    /// file named by `CADENCE_CONFIG` is an error.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("CADENCE_CONFIG").is_ok();
        let config_path = resolve_config_path()?;
        if !explicit && !config_path.exists() {
            tracing::debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.collection.validate()?;
        self.output.utc_offset()?;
        if self.output.path.trim().is_empty() {
            return Err(ConfigError::MissingField("output.path".to_string()).into());
        }
        Ok(())
    }

    pub fn credentials_path(&self) -> PathBuf {
        expand_path(&self.account.credentials_file)
    }

    pub fn output_path(&self) -> PathBuf {
        expand_path(&self.output.path)
    }
}

/// Resolve the configuration file path, honouring `CADENCE_CONFIG`
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CADENCE_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("cadence").join("config.toml"))
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

fn invalid(field: &str, reason: &str) -> crate::error::CadenceError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
