//! Content-addressed TTL cache for provider responses.
//!
//! - [`fingerprint`]: typed request parameters and the SHA-256 cache key
//! - [`CacheBackend`] / [`SqliteCache`]: durable entry store and maintenance log
//! - [`ResponseCache`]: `get`/`set` with expiry enforcement and lazy eviction,
//!   plus sweep, flush and statistics
//!
//! There is no in-process coordination between callers. Concurrent writers of
//! the same fingerprint rely on the store's atomic upsert; the last one wins.

pub mod fingerprint;
mod maintenance;
mod response_cache;
mod sqlite;
mod traits;

pub use fingerprint::{CacheParams, Fingerprint, ParamValue};
pub use maintenance::{FlushReport, ScheduledSweep, SweepReport};
pub use response_cache::{CacheLookup, CacheSource, ResponseCache};
pub use sqlite::SqliteCache;
pub use traits::{
    CacheBackend, CacheEntry, CacheStats, EndpointStats, MaintenanceKind, MaintenanceRecord,
};
