//! Response cache handlers: statistics, maintenance and direct get/set.

use super::shared::{cache_params, get_param, require_str_param};
use crate::server::AppState;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::warn;
use wayfare_core::{ScheduledSweep, WayfareError};

const SECS_PER_DAY: f64 = 86_400.0;

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn days(duration: Duration) -> f64 {
    // Two decimals is plenty for an operator view
    (duration.as_secs_f64() / SECS_PER_DAY * 100.0).round() / 100.0
}

pub async fn cache_stats(state: &AppState, _params: &Value) -> wayfare_core::Result<Value> {
    let stats = state.cache.stats()?;
    Ok(serde_json::to_value(stats)?)
}

pub async fn cache_clear(state: &AppState, _params: &Value) -> wayfare_core::Result<Value> {
    let report = state.cache.flush_all()?;
    Ok(json!({
        "message": format!("Cleared {} cache entries", report.deleted_count),
        "deleted_entries": report.deleted_count,
        "duration_ms": report.duration_ms,
        "timestamp": now_timestamp(),
    }))
}

pub async fn cache_cleanup(state: &AppState, _params: &Value) -> wayfare_core::Result<Value> {
    let report = state.cache.sweep_expired()?;
    Ok(json!({
        "message": format!("Removed {} expired cache entries", report.deleted_count),
        "statistics": {
            "deleted_entries": report.deleted_count,
            "remaining_entries": report.remaining_count,
            "duration_ms": report.duration_ms,
        },
        "timestamp": now_timestamp(),
    }))
}

pub async fn cache_auto_cleanup(state: &AppState, _params: &Value) -> wayfare_core::Result<Value> {
    let mut response = match state.cache.sweep_if_due()? {
        ScheduledSweep::Performed { report, since_last } => json!({
            "performed": true,
            "message": "Automatic cleanup performed",
            "days_since_last_cleanup": since_last.map(days),
            "statistics": {
                "deleted_entries": report.deleted_count,
                "remaining_entries": report.remaining_count,
                "duration_ms": report.duration_ms,
            },
        }),
        ScheduledSweep::NotDue {
            since_last,
            next_due_in,
        } => json!({
            "performed": false,
            "message": "Cleanup not needed yet",
            "days_since_last_cleanup": days(since_last),
            "next_cleanup_due_days": days(next_due_in),
        }),
    };

    if let Some(obj) = response.as_object_mut() {
        obj.insert("timestamp".into(), json!(now_timestamp()));
    }
    Ok(response)
}

/// Read an entry. Store failures are reported as a miss.
pub async fn cache_get(state: &AppState, params: &Value) -> wayfare_core::Result<Value> {
    let endpoint = require_str_param(params, "endpoint", "endpoint")?;
    let request_params = cache_params(params)?;

    let payload = match state.cache.get(&endpoint, &request_params) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(%endpoint, "Cache read failed, reporting miss: {}", e);
            None
        }
    };

    Ok(json!({
        "hit": payload.is_some(),
        "payload": payload,
    }))
}

/// Write an entry. Store failures are reported as `stored: false`.
pub async fn cache_set(state: &AppState, params: &Value) -> wayfare_core::Result<Value> {
    let endpoint = require_str_param(params, "endpoint", "endpoint")?;
    let request_params = cache_params(params)?;
    let payload = get_param(params, "payload", "payload")
        .cloned()
        .ok_or_else(|| WayfareError::InvalidParams {
            message: "Missing required parameter: payload".into(),
        })?;

    let ttl = match get_param(params, "ttl_seconds", "ttlSeconds") {
        Some(raw) => match raw.as_i64() {
            Some(secs) if secs > 0 => Some(Duration::from_secs(secs as u64)),
            Some(secs) => {
                return Err(WayfareError::InvalidParams {
                    message: format!("ttl_seconds must be positive, got {}", secs),
                })
            }
            None => {
                return Err(WayfareError::InvalidParams {
                    message: format!("ttl_seconds must be an integer, got {}", raw),
                })
            }
        },
        None => None,
    };

    let result = match ttl {
        Some(ttl) => state
            .cache
            .set_with_ttl(&endpoint, &request_params, &payload, ttl),
        None => state.cache.set(&endpoint, &request_params, &payload),
    };

    match result {
        Ok(()) => Ok(json!({"stored": true})),
        // Only set_with_ttl validates here: the ttl put the expiry out of range
        Err(WayfareError::Validation { message, .. }) => Err(WayfareError::InvalidParams {
            message: format!("ttl_seconds is out of range: {}", message),
        }),
        Err(e) => {
            warn!(%endpoint, "Cache write failed: {}", e);
            Ok(json!({"stored": false, "error": e.to_string()}))
        }
    }
}
