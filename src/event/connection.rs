use std::sync::Arc;

use tracing::{info, instrument};

use crate::event::store::{EventStore, StoreConnection};
use crate::metrics::MetricsCollector;
use crate::retry::RetryPolicy;
use crate::utils::MonitorError;

/// Opens store connections with bounded retry
///
/// Each attempt counts toward `db_connection_attempts`; running out of attempts adds
/// one `db_connection_failures`. Calls are independent of each other.
#[derive(Clone)]
pub struct ConnectionManager {
    store: Arc<dyn EventStore>,
    policy: RetryPolicy,
    metrics: Arc<MetricsCollector>,
}

impl ConnectionManager {
    pub fn new(
        store: Arc<dyn EventStore>,
        policy: RetryPolicy,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            policy,
            metrics,
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn connect(&self) -> Result<Box<dyn StoreConnection>, MonitorError> {
        let result = self
            .policy
            .run("db_connect", |_| {
                self.metrics.record_connection_attempt();
                self.store.connect()
            })
            .await;

        match result {
            Ok(connection) => {
                info!("Connected to the event store");
                Ok(connection)
            }
            Err(exhausted) => {
                self.metrics.record_connection_failure();
                Err(MonitorError::ConnectionExhausted {
                    attempts: exhausted.attempts,
                    source: exhausted.last_error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::store::StoreResult;
    use crate::event::OfflineEvent;
    use crate::utils::StoreError;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    struct NoopConnection;

    #[async_trait]
    impl StoreConnection for NoopConnection {
        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn fetch_offline_events(
            &self,
            _since: NaiveDateTime,
        ) -> StoreResult<Vec<OfflineEvent>> {
            Ok(Vec::new())
        }

        async fn close(self: Box<Self>) -> StoreResult<()> {
            Ok(())
        }
    }

    /// Refuses the first `failures` connects
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl EventStore for FlakyStore {
        async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                Ok(Box::new(NoopConnection))
            }
        }
    }

    fn manager(failures: u32, metrics: Arc<MetricsCollector>) -> ConnectionManager {
        let store = Arc::new(FlakyStore {
            failures,
            calls: AtomicU32::new(0),
        });
        ConnectionManager::new(store, RetryPolicy::new(3, Duration::from_secs(5)), metrics)
    }

    #[tokio::test(start_paused = true)]
    async fn should_connect_on_first_attempt() {
        // Arrange
        let metrics = Arc::new(MetricsCollector::new());
        let manager = manager(0, Arc::clone(&metrics));

        // Act
        let result = manager.connect().await;

        // Assert
        assert!(result.is_ok());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.db_connection_attempts, 1);
        assert_eq!(snapshot.db_connection_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_count_every_attempt_until_success() {
        // Arrange
        let metrics = Arc::new(MetricsCollector::new());
        let manager = manager(2, Arc::clone(&metrics));
        let started = Instant::now();

        // Act
        let result = manager.connect().await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.db_connection_attempts, 3);
        assert_eq!(snapshot.db_connection_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_exhaustion_as_typed_error() {
        // Arrange
        let metrics = Arc::new(MetricsCollector::new());
        let manager = manager(u32::MAX, Arc::clone(&metrics));

        // Act
        let result = manager.connect().await;

        // Assert
        match result {
            Err(MonitorError::ConnectionExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            Err(other) => panic!("expected ConnectionExhausted, got {other:?}"),
            Ok(_) => panic!("expected ConnectionExhausted, got a connection"),
        }
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.db_connection_attempts, 3);
        assert_eq!(snapshot.db_connection_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_carry_state_between_calls() {
        // Arrange
        let metrics = Arc::new(MetricsCollector::new());
        let manager = manager(3, Arc::clone(&metrics));

        // Act
        let first = manager.connect().await;
        let second = manager.connect().await;

        // Assert
        assert!(first.is_err());
        assert!(second.is_ok());
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.db_connection_attempts, 4);
        assert_eq!(snapshot.db_connection_failures, 1);
    }
}
