//! Cache backend trait and types.

use super::fingerprint::{CacheParams, Fingerprint};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A cached provider response with its identity and lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Derived from `endpoint` and `params`; never chosen by the caller.
    pub fingerprint: Fingerprint,
    /// Logical provider call that produced the payload (e.g. "hotels").
    pub endpoint: String,
    /// Exact request parameters behind the payload.
    pub params: CacheParams,
    /// Provider response body, opaque to the cache.
    pub payload: Value,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry for `endpoint`/`params`, deriving its fingerprint.
    pub fn new(
        endpoint: &str,
        params: &CacheParams,
        payload: Value,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint: Fingerprint::derive(endpoint, params),
            endpoint: endpoint.to_string(),
            params: params.clone(),
            payload,
            created_at,
            expires_at,
        }
    }

    /// An entry is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Kind of maintenance operation recorded in the maintenance log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceKind {
    Sweep,
    Flush,
}

impl MaintenanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceKind::Sweep => "sweep",
            MaintenanceKind::Flush => "flush",
        }
    }
}

impl FromStr for MaintenanceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sweep" => Ok(MaintenanceKind::Sweep),
            "flush" => Ok(MaintenanceKind::Flush),
            other => Err(format!("unknown maintenance kind: {}", other)),
        }
    }
}

impl fmt::Display for MaintenanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only maintenance log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub kind: MaintenanceKind,
    pub performed_at: DateTime<Utc>,
    pub deleted_count: u64,
    pub duration_ms: u64,
}

/// Entry counts for one provider endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}

/// Cache statistics across all endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// All stored rows, expired or not.
    pub total: usize,
    /// Rows that would still be served.
    pub active: usize,
    /// Rows past their expiry that have not been swept yet.
    pub expired: usize,
    /// Per-endpoint breakdown, ordered by endpoint name.
    pub endpoints: Vec<EndpointStats>,
    /// When the last sweep was recorded.
    pub last_sweep: Option<DateTime<Utc>>,
}

/// Durable storage for cache entries.
///
/// Implementations own atomicity: `upsert` must be a single
/// insert-or-replace so concurrent writers of the same fingerprint leave
/// exactly one row behind. Expiry policy lives in the access layer, so
/// `get_entry` returns rows whether or not they have expired.
/// All operations are synchronous to match rusqlite's API.
pub trait CacheBackend: Send + Sync {
    /// Look up an entry by fingerprint, expired or not.
    fn get_entry(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>>;

    /// Insert the entry, replacing any existing row with the same fingerprint.
    fn upsert(&self, entry: &CacheEntry) -> Result<()>;

    /// Delete one entry. Returns whether a row was removed.
    fn delete(&self, fingerprint: &Fingerprint) -> Result<bool>;

    /// Delete every entry with `expires_at <= now`, returning the count.
    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Delete every entry, returning the count.
    fn delete_all(&self) -> Result<usize>;

    /// Count entries, split by expiry state relative to `now`.
    fn stats(&self, now: DateTime<Utc>) -> Result<CacheStats>;

    /// Append a record to the maintenance log.
    fn record_maintenance(&self, record: &MaintenanceRecord) -> Result<()>;

    /// Most recent maintenance record of the given kind.
    fn last_maintenance(&self, kind: MaintenanceKind) -> Result<Option<MaintenanceRecord>>;
}
