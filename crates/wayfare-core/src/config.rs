//! Centralized configuration for Wayfare.
//!
//! Constants for cache lifetimes, maintenance cadence, network timeouts and
//! on-disk locations, plus the runtime [`CacheConfig`] handed to the cache.

use crate::error::{Result, WayfareError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DAY: u64 = 24 * 60 * 60;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Wayfare";
    pub const DATA_DIR_NAME: &'static str = "wayfare";
}

/// Cache lifetimes and maintenance cadence.
pub struct CacheSettings;

impl CacheSettings {
    /// Lifetime of a cached provider response when the caller gives no TTL.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * DAY);
    /// Minimum gap between two scheduled sweeps.
    pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(7 * DAY);
    /// How long a writer waits on a locked database before giving up.
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DB_FILE_NAME: &'static str = "response-cache.sqlite";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const USER_AGENT: &'static str = concat!("Wayfare/", env!("CARGO_PKG_VERSION"));
}

/// Shared directory and path configurations.
pub struct PathsConfig;

impl PathsConfig {
    /// Default location of the cache database.
    ///
    /// Falls back to the working directory when the platform has no data dir.
    pub fn default_db_path() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join(AppConfig::DATA_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CacheSettings::DB_FILE_NAME)
    }
}

/// Runtime configuration for the response cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// TTL applied by `ResponseCache::set`.
    pub default_ttl: Duration,
    /// Minimum elapsed time since the last sweep before `sweep_if_due` runs one.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: CacheSettings::DEFAULT_TTL,
            sweep_interval: CacheSettings::DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the scheduled sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Reject values that would make every entry expire on write or make the
    /// scheduled sweep run on every call.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(WayfareError::Config {
                message: "default_ttl must be greater than zero".into(),
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(WayfareError::Config {
                message: "sweep_interval must be greater than zero".into(),
            });
        }
        let representable = chrono::Duration::from_std(self.default_ttl)
            .ok()
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .is_some();
        if !representable {
            return Err(WayfareError::Config {
                message: format!("default_ttl {:?} is out of range", self.default_ttl),
            });
        }
        Ok(())
    }
}
