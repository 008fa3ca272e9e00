//! Wayfare Core - durable response cache for travel-planning provider calls.
//!
//! Responses from third-party providers (flight, hotel and location search,
//! points of interest, generative itineraries, images) are cached in SQLite,
//! keyed by a SHA-256 fingerprint of the endpoint and its request parameters.
//! This crate has no HTTP/RPC surface of its own; see `wayfare-rpc`.
//!
//! # Example
//!
//! ```rust,ignore
//! use wayfare_core::{CacheConfig, CacheParams, ResponseCache};
//!
//! #[tokio::main]
//! async fn main() -> wayfare_core::Result<()> {
//!     let cache = ResponseCache::open("/tmp/wayfare.sqlite", CacheConfig::default())?;
//!     let params = CacheParams::new().with("keyword", "paris").with("subType", "CITY");
//!
//!     let lookup = cache
//!         .fetch_through("locations", &params, || async {
//!             Ok(serde_json::json!({"data": []}))
//!         })
//!         .await?;
//!     println!("served from {:?}", lookup.source);
//!
//!     let stats = cache.stats()?;
//!     println!("{} active entries", stats.active);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod providers;

pub use cache::{
    CacheBackend, CacheEntry, CacheLookup, CacheParams, CacheSource, CacheStats, EndpointStats,
    Fingerprint, FlushReport, MaintenanceKind, MaintenanceRecord, ParamValue, ResponseCache,
    ScheduledSweep, SqliteCache, SweepReport,
};
pub use config::{CacheConfig, PathsConfig};
pub use error::{Result, WayfareError};
pub use providers::{
    build_http_client, CachedProvider, HttpJsonProvider, ProviderAdapter, ProviderEndpoint,
};
