//! Read/write access to cached provider responses.
//!
//! `get` and `set*` report store failures to the caller as `Err`. The policy
//! for those failures lives in [`ResponseCache::fetch_through`]: a failed
//! lookup is a miss and a failed write is a dropped write, both logged as
//! warnings and never surfaced to the end user.

use super::fingerprint::{CacheParams, Fingerprint};
use super::sqlite::SqliteCache;
use super::traits::{CacheBackend, CacheEntry};
use crate::config::CacheConfig;
use crate::error::{Result, WayfareError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Where a payload returned by [`ResponseCache::fetch_through`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    Hit,
    Miss,
}

/// Payload plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub payload: Value,
    pub source: CacheSource,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        self.source == CacheSource::Hit
    }
}

/// TTL cache in front of provider calls.
///
/// Holds no in-memory entries; all state lives in the backend, so clones can
/// be handed to every request handler.
#[derive(Clone)]
pub struct ResponseCache {
    pub(super) backend: Arc<dyn CacheBackend>,
    pub(super) config: CacheConfig,
}

impl ResponseCache {
    /// Create a cache over an existing backend with default configuration.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_config(backend, CacheConfig::default())
    }

    /// Create a cache over an existing backend.
    pub fn with_config(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self { backend, config }
    }

    /// Open a SQLite-backed cache at `db_path`.
    pub fn open(db_path: impl AsRef<Path>, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let backend = SqliteCache::new(db_path)?;
        Ok(Self::with_config(Arc::new(backend), config))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live cached payload.
    ///
    /// An expired entry is deleted on the way out (best-effort) and reported
    /// as absent.
    pub fn get(&self, endpoint: &str, params: &CacheParams) -> Result<Option<Value>> {
        let fingerprint = Fingerprint::derive(endpoint, params);

        let entry = match self.backend.get_entry(&fingerprint)? {
            Some(entry) => entry,
            None => {
                debug!(endpoint, %fingerprint, "cache miss");
                return Ok(None);
            }
        };

        if entry.is_expired_at(Utc::now()) {
            debug!(endpoint, %fingerprint, expires_at = %entry.expires_at, "cache entry expired");
            if let Err(e) = self.backend.delete(&fingerprint) {
                // Next read will see it as expired again
                warn!(endpoint, %fingerprint, "Failed to evict expired cache entry: {}", e);
            }
            return Ok(None);
        }

        debug!(endpoint, %fingerprint, "cache hit");
        Ok(Some(entry.payload))
    }

    /// Store a payload with the configured default TTL.
    pub fn set(&self, endpoint: &str, params: &CacheParams, payload: &Value) -> Result<()> {
        self.set_with_ttl(endpoint, params, payload, self.config.default_ttl)
    }

    /// Store a payload that expires `ttl` from now.
    pub fn set_with_ttl(
        &self,
        endpoint: &str,
        params: &CacheParams,
        payload: &Value,
        ttl: Duration,
    ) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| WayfareError::Validation {
            field: "ttl".into(),
            message: format!("{:?} is out of range", ttl),
        })?;
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| WayfareError::Validation {
                field: "ttl".into(),
                message: "expiry is past the latest representable time".into(),
            })?;
        self.store(endpoint, params, payload, now, expires_at)
    }

    /// Store a payload with an explicit expiry time.
    pub fn set_with_expiry(
        &self,
        endpoint: &str,
        params: &CacheParams,
        payload: &Value,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.store(endpoint, params, payload, Utc::now(), expires_at)
    }

    fn store(
        &self,
        endpoint: &str,
        params: &CacheParams,
        payload: &Value,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = CacheEntry::new(endpoint, params, payload.clone(), created_at, expires_at);
        self.backend.upsert(&entry)?;
        debug!(endpoint, fingerprint = %entry.fingerprint, %expires_at, "cache entry stored");
        Ok(())
    }

    /// Serve from cache, or call `fetch` and cache its result.
    ///
    /// Cache errors never fail this call. Errors from `fetch` are returned
    /// unchanged and nothing is cached for them.
    pub async fn fetch_through<F, Fut>(
        &self,
        endpoint: &str,
        params: &CacheParams,
        fetch: F,
    ) -> Result<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        match self.get(endpoint, params) {
            Ok(Some(payload)) => {
                return Ok(CacheLookup {
                    payload,
                    source: CacheSource::Hit,
                })
            }
            Ok(None) => {}
            Err(e) => warn!(endpoint, "Cache lookup failed, calling provider: {}", e),
        }

        let payload = fetch().await?;

        if let Err(e) = self.set(endpoint, params, &payload) {
            warn!(endpoint, "Failed to cache provider response: {}", e);
        }

        Ok(CacheLookup {
            payload,
            source: CacheSource::Miss,
        })
    }
}
