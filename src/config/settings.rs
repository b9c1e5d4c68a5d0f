//! Ledger settings loaded from `workforce.toml`.
//!
//! Every section has defaults, so a missing file or a partial file is fine.
//! The path can be overridden with the `WORKFORCE_CONFIG` environment variable.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "workforce.toml";

/// Configuration structure representing the entire workforce.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Company identity used for employee codes
    pub company: CompanySettings,
    /// Attendance derivation rules
    pub attendance: AttendanceSettings,
    /// Employee code allocation
    pub allocation: AllocationSettings,
    /// Store connection and timeouts
    pub store: StoreSettings,
}

/// `[company]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompanySettings {
    /// Two-letter prefix of every employee code
    pub code: String,
}

impl Default for CompanySettings {
    fn default() -> Self {
        Self {
            code: "OD".to_string(),
        }
    }
}

/// `[attendance]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttendanceSettings {
    /// Worked hours below which a closed day counts as a half day
    pub half_day_hours: u32,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self { half_day_hours: 4 }
    }
}

impl AttendanceSettings {
    /// Threshold as a duration.
    #[must_use]
    pub fn half_day_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.half_day_hours))
    }
}

/// `[allocation]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocationSettings {
    /// Attempts before a contended allocation gives up
    pub max_attempts: u32,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// `[store]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Pool size
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Seconds a single ledger operation may take before it is rolled back
    pub operation_timeout_secs: u64,
    /// Seconds a `SQLite` writer waits for another writer's lock
    pub busy_timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout_secs: 5,
            operation_timeout_secs: 10,
            busy_timeout_secs: 5,
        }
    }
}

impl StoreSettings {
    /// Pool acquire timeout.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Per-operation timeout.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// `SQLite` lock wait.
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

impl Settings {
    /// Rejects values the ledger cannot run with.
    pub fn validate(&self) -> Result<()> {
        let code = &self.company.code;
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::Config {
                message: format!("company.code must be two uppercase ASCII letters, got {code:?}"),
            });
        }
        if self.allocation.max_attempts == 0 {
            return Err(Error::Config {
                message: "allocation.max_attempts must be at least 1".to_string(),
            });
        }
        if self.store.max_connections == 0 {
            return Err(Error::Config {
                message: "store.max_connections must be at least 1".to_string(),
            });
        }
        if self.store.operation_timeout_secs == 0 {
            return Err(Error::Config {
                message: "store.operation_timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses and validates settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings: {e}"),
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value fails validation
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    debug!("Loading settings from {:?}", path.as_ref());
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {:?}: {e}", path.as_ref()),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `WORKFORCE_CONFIG` or `./workforce.toml`, falling back
/// to defaults when the file does not exist.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("WORKFORCE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        load_settings(&path)
    } else {
        info!("No config file at {path}, using default settings");
        let settings = Settings::default();
        settings.validate()?;
        Ok(settings)
    }
}
