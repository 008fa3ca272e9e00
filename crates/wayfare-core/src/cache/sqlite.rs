//! SQLite-backed response cache store.

use super::fingerprint::{CacheParams, Fingerprint};
use super::traits::{
    CacheBackend, CacheEntry, CacheStats, EndpointStats, MaintenanceKind, MaintenanceRecord,
};
use crate::config::CacheSettings;
use crate::error::{Result, WayfareError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// SQLite-based cache backend.
///
/// One table of entries keyed by fingerprint plus an append-only maintenance
/// log. Thread-safe via an internal mutex on the connection; cross-process
/// writers are serialized by SQLite itself (WAL + busy timeout).
#[derive(Clone)]
pub struct SqliteCache {
    /// Database connection (wrapped for thread safety).
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) a cache database at the specified path.
    ///
    /// Creates parent directories and tables if they don't exist.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| WayfareError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| WayfareError::Database {
            message: format!("Failed to open cache database: {}", e),
            source: Some(e),
        })?;

        Self::from_connection(conn)
    }

    /// Create a cache that lives only as long as this value.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| WayfareError::Database {
            message: format!("Failed to open in-memory cache database: {}", e),
            source: Some(e),
        })?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // WAL lets sweeps run while readers keep reading
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;
        conn.busy_timeout(CacheSettings::BUSY_TIMEOUT)
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to set busy timeout: {}", e),
                source: Some(e),
            })?;

        let cache = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(WayfareError::lock_poisoned)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS response_cache (
                fingerprint TEXT PRIMARY KEY,
                endpoint TEXT NOT NULL,
                params TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );

            -- Sweeps and stats filter on expiry
            CREATE INDEX IF NOT EXISTS idx_response_cache_expires
                ON response_cache(expires_at);

            CREATE INDEX IF NOT EXISTS idx_response_cache_endpoint
                ON response_cache(endpoint);

            CREATE TABLE IF NOT EXISTS cache_maintenance_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                performed_at TEXT NOT NULL,
                deleted_count INTEGER NOT NULL,
                duration_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_maintenance_kind_time
                ON cache_maintenance_log(kind, performed_at);
            "#,
        )
        .map_err(|e| WayfareError::Database {
            message: format!("Failed to initialize cache schema: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }
}

/// Fixed-width UTC timestamps so that SQL string comparison is chronological.
fn to_db_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn from_db_time(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WayfareError::Database {
            message: format!("Invalid {} timestamp '{}': {}", column, value, e),
            source: None,
        })
}

impl CacheBackend for SqliteCache {
    fn get_entry(&self, fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;

        let row: Option<(String, String, String, String, String)> = conn
            .query_row(
                r#"
                SELECT endpoint, params, payload, created_at, expires_at
                FROM response_cache
                WHERE fingerprint = ?1
                "#,
                params![fingerprint.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to query cache entry: {}", e),
                source: Some(e),
            })?;

        let (endpoint, params_json, payload_json, created_at, expires_at) = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let params: CacheParams = serde_json::from_str(&params_json)?;
        let payload = serde_json::from_str(&payload_json)?;

        Ok(Some(CacheEntry {
            fingerprint: fingerprint.clone(),
            endpoint,
            params,
            payload,
            created_at: from_db_time("created_at", &created_at)?,
            expires_at: from_db_time("expires_at", &expires_at)?,
        }))
    }

    fn upsert(&self, entry: &CacheEntry) -> Result<()> {
        let params_json = entry.params.to_canonical_json();
        let payload_json = serde_json::to_string(&entry.payload)?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO response_cache
                (fingerprint, endpoint, params, payload, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(fingerprint) DO UPDATE SET
                endpoint = excluded.endpoint,
                params = excluded.params,
                payload = excluded.payload,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
            params![
                entry.fingerprint.as_str(),
                entry.endpoint,
                params_json,
                payload_json,
                to_db_time(entry.created_at),
                to_db_time(entry.expires_at),
            ],
        )
        .map_err(|e| WayfareError::Database {
            message: format!("Failed to upsert cache entry: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }

    fn delete(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let conn = self.lock()?;

        let deleted = conn
            .execute(
                "DELETE FROM response_cache WHERE fingerprint = ?1",
                params![fingerprint.as_str()],
            )
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to delete cache entry: {}", e),
                source: Some(e),
            })?;

        Ok(deleted > 0)
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn
            .execute(
                "DELETE FROM response_cache WHERE expires_at <= ?1",
                params![to_db_time(now)],
            )
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to delete expired entries: {}", e),
                source: Some(e),
            })?;

        if deleted > 0 {
            debug!("Deleted {} expired cache entries", deleted);
        }

        Ok(deleted)
    }

    fn delete_all(&self) -> Result<usize> {
        let conn = self.lock()?;

        let deleted = conn
            .execute("DELETE FROM response_cache", [])
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to clear cache entries: {}", e),
                source: Some(e),
            })?;

        debug!("Cleared {} cache entries", deleted);

        Ok(deleted)
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<CacheStats> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT endpoint,
                       COUNT(*),
                       COALESCE(SUM(CASE WHEN expires_at <= ?1 THEN 1 ELSE 0 END), 0)
                FROM response_cache
                GROUP BY endpoint
                ORDER BY endpoint
                "#,
            )
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to prepare stats query: {}", e),
                source: Some(e),
            })?;

        let endpoints: Vec<EndpointStats> = stmt
            .query_map(params![to_db_time(now)], |row| {
                let endpoint: String = row.get(0)?;
                let total: i64 = row.get(1)?;
                let expired: i64 = row.get(2)?;
                Ok(EndpointStats {
                    endpoint,
                    total: total as usize,
                    active: (total - expired) as usize,
                    expired: expired as usize,
                })
            })
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to query stats: {}", e),
                source: Some(e),
            })?
            .collect::<std::result::Result<_, _>>()?;

        drop(stmt);

        let last_sweep: Option<String> = conn
            .query_row(
                r#"
                SELECT performed_at FROM cache_maintenance_log
                WHERE kind = ?1
                ORDER BY performed_at DESC, id DESC
                LIMIT 1
                "#,
                params![MaintenanceKind::Sweep.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(CacheStats {
            total: endpoints.iter().map(|e| e.total).sum(),
            active: endpoints.iter().map(|e| e.active).sum(),
            expired: endpoints.iter().map(|e| e.expired).sum(),
            endpoints,
            last_sweep: last_sweep
                .map(|s| from_db_time("performed_at", &s))
                .transpose()?,
        })
    }

    fn record_maintenance(&self, record: &MaintenanceRecord) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO cache_maintenance_log (kind, performed_at, deleted_count, duration_ms)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.kind.as_str(),
                to_db_time(record.performed_at),
                record.deleted_count as i64,
                record.duration_ms as i64,
            ],
        )
        .map_err(|e| WayfareError::Database {
            message: format!("Failed to record maintenance: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }

    fn last_maintenance(&self, kind: MaintenanceKind) -> Result<Option<MaintenanceRecord>> {
        let conn = self.lock()?;

        let row: Option<(String, i64, i64)> = conn
            .query_row(
                r#"
                SELECT performed_at, deleted_count, duration_ms
                FROM cache_maintenance_log
                WHERE kind = ?1
                ORDER BY performed_at DESC, id DESC
                LIMIT 1
                "#,
                params![kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| WayfareError::Database {
                message: format!("Failed to read maintenance log: {}", e),
                source: Some(e),
            })?;

        row.map(|(performed_at, deleted_count, duration_ms)| {
            Ok(MaintenanceRecord {
                kind,
                performed_at: from_db_time("performed_at", &performed_at)?,
                deleted_count: deleted_count.max(0) as u64,
                duration_ms: duration_ms.max(0) as u64,
            })
        })
        .transpose()
    }
}
