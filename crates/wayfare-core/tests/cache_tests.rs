//! Integration tests for the response cache public interface.
//!
//! These run against a real SQLite file in a temp directory, plus a backend
//! that fails every call to check that cache trouble never reaches callers.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wayfare_core::{
    CacheBackend, CacheConfig, CacheEntry, CacheParams, CacheSource, CacheStats, Fingerprint,
    MaintenanceKind, MaintenanceRecord, ProviderEndpoint, ResponseCache, Result, WayfareError,
};

/// Create a file-backed cache in a fresh temp directory.
fn create_test_cache() -> (TempDir, ResponseCache) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cache = ResponseCache::open(
        temp_dir.path().join("cache").join("responses.sqlite"),
        CacheConfig::default(),
    )
    .expect("Failed to open cache");
    (temp_dir, cache)
}

fn location_params() -> CacheParams {
    CacheParams::new()
        .with("keyword", "paris")
        .with("subType", "CITY,AIRPORT")
}

#[test]
fn test_fingerprint_ignores_key_order() {
    let forward: CacheParams = [("keyword", "paris"), ("subType", "CITY")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Into::<wayfare_core::ParamValue>::into(v)))
        .collect();
    let reverse: CacheParams = [("subType", "CITY"), ("keyword", "paris")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Into::<wayfare_core::ParamValue>::into(v)))
        .collect();

    assert_eq!(
        Fingerprint::derive("locations", &forward),
        Fingerprint::derive("locations", &reverse)
    );

    let from_json = CacheParams::from_json(&json!({"subType": "CITY", "keyword": "paris"})).unwrap();
    assert_eq!(
        Fingerprint::derive("locations", &forward),
        Fingerprint::derive("locations", &from_json)
    );
}

#[test]
fn test_endpoints_are_separate_namespaces() {
    let (_temp, cache) = create_test_cache();
    let params = CacheParams::new().with("cityCode", "PAR");

    assert_ne!(
        Fingerprint::derive("hotels", &params),
        Fingerprint::derive("poi", &params)
    );

    cache.set("hotels", &params, &json!({"source": "hotels"})).unwrap();
    assert_eq!(
        cache.get("hotels", &params).unwrap(),
        Some(json!({"source": "hotels"}))
    );
    assert_eq!(cache.get("poi", &params).unwrap(), None);
}

#[test]
fn test_set_then_get_returns_payload() {
    let (_temp, cache) = create_test_cache();
    let payload = json!({
        "data": [{"iataCode": "PAR", "name": "PARIS", "geoCode": {"latitude": 48.85}}],
        "meta": {"count": 1}
    });

    cache.set("locations", &location_params(), &payload).unwrap();

    assert_eq!(cache.get("locations", &location_params()).unwrap(), Some(payload));
}

#[test]
fn test_short_ttl_expires() {
    let (_temp, cache) = create_test_cache();
    cache
        .set_with_ttl(
            "flights",
            &location_params(),
            &json!({"offers": []}),
            Duration::from_millis(1),
        )
        .unwrap();

    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(cache.get("flights", &location_params()).unwrap(), None);
    // Lazy eviction removed the row
    assert_eq!(cache.stats().unwrap().total, 0);
}

#[test]
fn test_overwrite_keeps_single_entry() {
    let (_temp, cache) = create_test_cache();

    cache.set("hotels", &location_params(), &json!({"v": 1})).unwrap();
    cache.set("hotels", &location_params(), &json!({"v": 2})).unwrap();

    assert_eq!(
        cache.get("hotels", &location_params()).unwrap(),
        Some(json!({"v": 2}))
    );
    let stats = cache.stats().unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.endpoints.len(), 1);
    assert_eq!(stats.endpoints[0].endpoint, "hotels");
}

#[test]
fn test_sweep_removes_only_expired() {
    let (_temp, cache) = create_test_cache();
    let past = Utc::now() - chrono::Duration::hours(1);

    for i in 0..3 {
        let params = CacheParams::new().with("page", i);
        cache.set_with_expiry("poi", &params, &json!(i), past).unwrap();
    }
    for i in 0..2 {
        let params = CacheParams::new().with("page", i);
        cache.set("hotels", &params, &json!(i)).unwrap();
    }

    let before = cache.stats().unwrap();
    assert_eq!(before.total, 5);
    assert_eq!(before.expired, 3);
    assert_eq!(before.active, 2);

    let report = cache.sweep_expired().unwrap();
    assert_eq!(report.deleted_count, 3);
    assert_eq!(report.remaining_count, Some(2));

    let after = cache.stats().unwrap();
    assert_eq!(after.total, 2);
    assert_eq!(after.expired, 0);
    assert!(after.last_sweep.is_some());
    for i in 0..2 {
        let params = CacheParams::new().with("page", i);
        assert_eq!(cache.get("hotels", &params).unwrap(), Some(json!(i)));
    }
}

#[test]
fn test_flush_empties_cache() {
    let (_temp, cache) = create_test_cache();
    let past = Utc::now() - chrono::Duration::hours(1);
    cache.set("hotels", &location_params(), &json!(1)).unwrap();
    cache.set_with_expiry("poi", &location_params(), &json!(2), past).unwrap();

    let report = cache.flush_all().unwrap();

    assert_eq!(report.deleted_count, 2);
    let stats = cache.stats().unwrap();
    assert_eq!(stats.total, 0);
    assert!(stats.endpoints.is_empty());
}

#[test]
fn test_entries_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("persist.sqlite");

    {
        let cache = ResponseCache::open(&db_path, CacheConfig::default()).unwrap();
        cache.set("gemini", &location_params(), &json!({"itinerary": []})).unwrap();
    }

    let cache = ResponseCache::open(&db_path, CacheConfig::default()).unwrap();
    assert_eq!(
        cache.get("gemini", &location_params()).unwrap(),
        Some(json!({"itinerary": []}))
    );
}

#[tokio::test]
async fn test_locations_lookup_end_to_end() {
    let (_temp, cache) = create_test_cache();
    let endpoint = ProviderEndpoint::Locations.as_str();
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let provider_response = json!({"data": [{"iataCode": "PAR", "subType": "CITY"}]});
    let expected = &provider_response;

    let first = cache
        .fetch_through(
            endpoint,
            &CacheParams::from_json(&json!({"keyword": "paris", "subType": "CITY,AIRPORT"}))
                .unwrap(),
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(expected.clone())
            },
        )
        .await
        .unwrap();

    let second = cache
        .fetch_through(
            endpoint,
            &CacheParams::from_json(&json!({"subType": "CITY,AIRPORT", "keyword": "paris"}))
                .unwrap(),
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"data": "should not be fetched"}))
            },
        )
        .await
        .unwrap();

    assert_eq!(first.source, CacheSource::Miss);
    assert_eq!(second.source, CacheSource::Hit);
    assert_eq!(second.payload, provider_response);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

/// Backend whose every call fails, as if the database were unreachable.
struct FailingBackend;

fn unreachable_db() -> WayfareError {
    WayfareError::Database {
        message: "database is unreachable".into(),
        source: None,
    }
}

impl CacheBackend for FailingBackend {
    fn get_entry(&self, _fingerprint: &Fingerprint) -> Result<Option<CacheEntry>> {
        Err(unreachable_db())
    }

    fn upsert(&self, _entry: &CacheEntry) -> Result<()> {
        Err(unreachable_db())
    }

    fn delete(&self, _fingerprint: &Fingerprint) -> Result<bool> {
        Err(unreachable_db())
    }

    fn delete_expired(&self, _now: DateTime<Utc>) -> Result<usize> {
        Err(unreachable_db())
    }

    fn delete_all(&self) -> Result<usize> {
        Err(unreachable_db())
    }

    fn stats(&self, _now: DateTime<Utc>) -> Result<CacheStats> {
        Err(unreachable_db())
    }

    fn record_maintenance(&self, _record: &MaintenanceRecord) -> Result<()> {
        Err(unreachable_db())
    }

    fn last_maintenance(&self, _kind: MaintenanceKind) -> Result<Option<MaintenanceRecord>> {
        Err(unreachable_db())
    }
}

#[tokio::test]
async fn test_fetch_through_survives_broken_store() {
    let cache = ResponseCache::new(Arc::new(FailingBackend));
    let counter = AtomicUsize::new(0);
    let calls = &counter;

    for _ in 0..2 {
        let lookup = cache
            .fetch_through("unsplash", &location_params(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<Value, WayfareError>(json!({"urls": {"regular": "https://img"}}))
            })
            .await
            .unwrap();
        assert_eq!(lookup.source, CacheSource::Miss);
    }

    // Every call goes live when nothing can be cached
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_maintenance_reports_broken_store() {
    let cache = ResponseCache::new(Arc::new(FailingBackend));

    assert!(matches!(
        cache.sweep_expired(),
        Err(WayfareError::Database { .. })
    ));
    assert!(matches!(cache.flush_all(), Err(WayfareError::Database { .. })));
    assert!(cache.stats().is_err());
    // Unreadable log means "due"; the sweep itself then fails
    assert!(cache.sweep_if_due().is_err());
    assert!(cache.get("hotels", &location_params()).is_err());
}
