//! Process counters and their JSON snapshot file

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::utils::MonitorError;

/// Counters shared by the monitor loop and the dispatch workers
#[derive(Debug, Default)]
pub struct MetricsCollector {
    notifications_sent: AtomicU64,
    failed_notifications: AtomicU64,
    db_connection_attempts: AtomicU64,
    db_connection_failures: AtomicU64,
    last_successful_check: RwLock<Option<DateTime<Local>>>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub notifications_sent: u64,
    pub failed_notifications: u64,
    pub db_connection_attempts: u64,
    pub db_connection_failures: u64,
    pub last_successful_check: Option<DateTime<Local>>,
}

/// On-disk shape of the metrics file
#[derive(Debug, Serialize)]
struct MetricsReport {
    notifications_sent: u64,
    failed_notifications: u64,
    db_connection_attempts: u64,
    db_connection_failures: u64,
    last_successful_check: Option<String>,
    timestamp: String,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_failed(&self) {
        self.failed_notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_attempt(&self) {
        self.db_connection_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_failure(&self) {
        self.db_connection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_successful_check(&self, at: DateTime<Local>) {
        let mut last = self
            .last_successful_check
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(at);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_successful_check = *self
            .last_successful_check
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        MetricsSnapshot {
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            failed_notifications: self.failed_notifications.load(Ordering::Relaxed),
            db_connection_attempts: self.db_connection_attempts.load(Ordering::Relaxed),
            db_connection_failures: self.db_connection_failures.load(Ordering::Relaxed),
            last_successful_check,
        }
    }

    /// Overwrite `path` with the current snapshot and a capture timestamp.
    pub async fn persist(&self, path: &Path) -> Result<(), MonitorError> {
        let report = self.snapshot().into_report(Local::now());
        let body = serde_json::to_vec_pretty(&report)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| MonitorError::MetricsPersist {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(path, body)
            .await
            .map_err(|source| MonitorError::MetricsPersist {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "Metrics saved");
        Ok(())
    }
}

impl MetricsSnapshot {
    fn into_report(self, captured_at: DateTime<Local>) -> MetricsReport {
        MetricsReport {
            notifications_sent: self.notifications_sent,
            failed_notifications: self.failed_notifications,
            db_connection_attempts: self.db_connection_attempts,
            db_connection_failures: self.db_connection_failures,
            last_successful_check: self.last_successful_check.map(|t| t.to_rfc3339()),
            timestamp: captured_at.to_rfc3339(),
        }
    }
}
