use std::sync::Arc;

use chrono::Local;
use tracing::{debug, error, instrument, warn};

use crate::event::ConnectionManager;
use crate::metrics::MetricsCollector;
use crate::utils::MonitorError;

/// Round-trip connectivity probe run before each poll
#[derive(Clone)]
pub struct HealthChecker {
    connections: ConnectionManager,
    metrics: Arc<MetricsCollector>,
}

impl HealthChecker {
    pub fn new(connections: ConnectionManager, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            connections,
            metrics,
        }
    }

    /// `true` when a fresh connection answered `SELECT 1`. Never propagates errors.
    #[instrument(skip(self), level = "debug")]
    pub async fn check(&self) -> bool {
        match self.probe().await {
            Ok(()) => {
                self.metrics.record_successful_check(Local::now());
                debug!("Health check passed");
                true
            }
            Err(e) => {
                error!(error = %e, "Health check failed");
                false
            }
        }
    }

    async fn probe(&self) -> Result<(), MonitorError> {
        let connection = self.connections.connect().await?;

        let ping = connection.ping().await;
        if let Err(e) = connection.close().await {
            warn!(error = %e, "Failed to close health check connection");
        }

        ping.map_err(MonitorError::HealthCheckFailed)
    }
}
