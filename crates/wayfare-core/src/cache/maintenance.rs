//! Bulk maintenance: expiry sweeps, full flushes and statistics.
//!
//! Each sweep or flush appends a record to the maintenance log. Writing that
//! record is best-effort; a failure is logged and the operation still succeeds.

use super::response_cache::ResponseCache;
use super::traits::{CacheStats, MaintenanceKind, MaintenanceRecord};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of an expiry sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub deleted_count: usize,
    /// Entries left after the sweep; `None` if they could not be counted.
    pub remaining_count: Option<usize>,
    pub duration_ms: u64,
    pub performed_at: DateTime<Utc>,
}

/// Outcome of a full flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushReport {
    pub deleted_count: usize,
    pub duration_ms: u64,
    pub performed_at: DateTime<Utc>,
}

/// Outcome of [`ResponseCache::sweep_if_due`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduledSweep {
    Performed {
        report: SweepReport,
        /// Time since the previous sweep, `None` if none was ever recorded.
        since_last: Option<Duration>,
    },
    NotDue {
        since_last: Duration,
        next_due_in: Duration,
    },
}

impl ScheduledSweep {
    pub fn performed(&self) -> bool {
        matches!(self, ScheduledSweep::Performed { .. })
    }
}

impl ResponseCache {
    /// Delete every expired entry in one bulk operation.
    pub fn sweep_expired(&self) -> Result<SweepReport> {
        let started = Instant::now();
        let performed_at = Utc::now();

        let deleted_count = self.backend.delete_expired(performed_at)?;
        let duration_ms = started.elapsed().as_millis() as u64;

        let remaining_count = match self.backend.stats(Utc::now()) {
            Ok(stats) => Some(stats.total),
            Err(e) => {
                warn!("Failed to count entries after sweep: {}", e);
                None
            }
        };

        self.log_maintenance(MaintenanceKind::Sweep, performed_at, deleted_count, duration_ms);

        info!(
            deleted = deleted_count,
            remaining = ?remaining_count,
            duration_ms,
            "Swept expired cache entries"
        );

        Ok(SweepReport {
            deleted_count,
            remaining_count,
            duration_ms,
            performed_at,
        })
    }

    /// Delete every entry regardless of expiry.
    pub fn flush_all(&self) -> Result<FlushReport> {
        let started = Instant::now();
        let performed_at = Utc::now();

        let deleted_count = self.backend.delete_all()?;
        let duration_ms = started.elapsed().as_millis() as u64;

        self.log_maintenance(MaintenanceKind::Flush, performed_at, deleted_count, duration_ms);

        info!(deleted = deleted_count, duration_ms, "Flushed response cache");

        Ok(FlushReport {
            deleted_count,
            duration_ms,
            performed_at,
        })
    }

    /// Sweep only if `sweep_interval` has passed since the last recorded sweep.
    ///
    /// An unreadable maintenance log counts as "never swept".
    pub fn sweep_if_due(&self) -> Result<ScheduledSweep> {
        let now = Utc::now();
        let last = match self.backend.last_maintenance(MaintenanceKind::Sweep) {
            Ok(last) => last,
            Err(e) => {
                warn!("Failed to read maintenance log, sweeping anyway: {}", e);
                None
            }
        };

        // A record from the future (clock skew) counts as just now
        let since_last = last.map(|record| {
            (now - record.performed_at)
                .to_std()
                .unwrap_or(Duration::ZERO)
        });

        match since_last {
            Some(elapsed) if elapsed < self.config.sweep_interval => {
                let next_due_in = self.config.sweep_interval - elapsed;
                debug!(?elapsed, ?next_due_in, "Scheduled sweep not due");
                Ok(ScheduledSweep::NotDue {
                    since_last: elapsed,
                    next_due_in,
                })
            }
            _ => {
                let report = self.sweep_expired()?;
                Ok(ScheduledSweep::Performed { report, since_last })
            }
        }
    }

    /// Total, active and expired counts, grouped by endpoint.
    pub fn stats(&self) -> Result<CacheStats> {
        self.backend.stats(Utc::now())
    }

    fn log_maintenance(
        &self,
        kind: MaintenanceKind,
        performed_at: DateTime<Utc>,
        deleted_count: usize,
        duration_ms: u64,
    ) {
        let record = MaintenanceRecord {
            kind,
            performed_at,
            deleted_count: deleted_count as u64,
            duration_ms,
        };
        if let Err(e) = self.backend.record_maintenance(&record) {
            warn!(%kind, "Failed to record maintenance: {}", e);
        }
    }
}
