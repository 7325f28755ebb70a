//! Configuration management for Solarlog
//!
//! This module handles loading and validation of the application
//! configuration. Files are parsed as YAML, which also accepts the plain JSON
//! `solarweb.json` files used by older installs.

use crate::credentials::Credentials;
use crate::error::{Result, SolarlogError};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod defaults;

/// Default locations searched by [`Config::load`]
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "solarweb.yaml",
    "solarweb.json",
    "/etc/solarlog/config.yaml",
];

/// Upper bound for `max_catchup_days`, about ten years
pub const MAX_CATCHUP_DAYS: u32 = 3660;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Solar.web login
    #[serde(flatten)]
    pub credentials: Credentials,

    /// First day with production data; enables backfill when set
    pub install_date: Option<NaiveDate>,

    /// Database file; falls back to the platform data directory
    pub database: Option<String>,

    /// Timezone used to decide which calendar day is "today"
    pub timezone: String,

    /// Delay between status polls in seconds
    pub poll_interval_secs: u64,

    /// Upper bound for a single portal request in seconds
    pub request_timeout_secs: u64,

    /// Minimum delay before retrying a failed login in seconds
    pub login_backoff_secs: u64,

    /// Pause between consecutive dates during backfill in milliseconds
    pub backfill_spacing_ms: u64,

    /// How many missed days the poller fetches after downtime
    pub max_catchup_days: u32,

    /// Terminate on authentication failures instead of retrying next tick
    pub exit_on_auth_error: bool,

    /// Refresh the five-minute/hourly/weekly/monthly tables after each cycle
    pub aggregate: bool,

    /// Portal endpoints
    pub portal: PortalConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Solar.web endpoints and request identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Solar.web site root
    pub base_url: String,

    /// Fronius identity provider form endpoint
    pub auth_url: String,

    /// User-Agent sent with every request
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional override for the console layer
    pub console_level: Option<String>,

    /// Optional override for the file layer
    pub file_level: Option<String>,

    /// Log directory or file path; no file logging when unset
    pub file: Option<String>,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML (or JSON) file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from an explicit path or the default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        for path in &DEFAULT_CONFIG_PATHS {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Err(SolarlogError::config(format!(
            "No configuration file found (searched: {})",
            DEFAULT_CONFIG_PATHS.join(", ")
        )))
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.credentials.is_complete() {
            let field = if self.credentials.username.trim().is_empty() {
                "username"
            } else {
                "password"
            };
            return Err(SolarlogError::validation(
                field.to_string(),
                format!("{} cannot be empty", field),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(SolarlogError::validation(
                "poll_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(SolarlogError::validation(
                "request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.max_catchup_days > MAX_CATCHUP_DAYS {
            return Err(SolarlogError::validation(
                "max_catchup_days".to_string(),
                format!(
                    "{} exceeds the limit of {} days, use --backfill for older history",
                    self.max_catchup_days, MAX_CATCHUP_DAYS
                ),
            ));
        }

        if Tz::from_str(&self.timezone).is_err() {
            return Err(SolarlogError::validation(
                "timezone".to_string(),
                format!("Unknown timezone: {}", self.timezone),
            ));
        }

        if self.portal.base_url.trim().is_empty() {
            return Err(SolarlogError::validation(
                "portal.base_url",
                "Base URL cannot be empty",
            ));
        }

        Ok(())
    }

    /// Parsed timezone, UTC when the name is unknown
    pub fn tz(&self) -> Tz {
        Tz::from_str(&self.timezone).unwrap_or(Tz::UTC)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Database path: explicit override, then config, then the data directory
    pub fn database_path(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = cli_override {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = self.database.as_ref().filter(|p| !p.trim().is_empty()) {
            return Ok(PathBuf::from(path));
        }
        dirs::data_dir()
            .map(|dir| dir.join("solarlogging").join("solarlogging.db"))
            .ok_or_else(|| {
                SolarlogError::config("Could not determine a data directory for the database")
            })
    }
}
