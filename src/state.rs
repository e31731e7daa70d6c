use std::sync::Arc;

use crate::metrics::MetricsCollector;
use crate::shutdown::ShutdownSignal;

/// Shared handles passed to every monitor component
#[derive(Debug, Clone, Default)]
pub struct MonitorContext {
    pub metrics: Arc<MetricsCollector>,
    pub shutdown: ShutdownSignal,
}

impl MonitorContext {
    pub fn new() -> Self {
        Self::default()
    }
}
