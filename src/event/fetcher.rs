use chrono::NaiveDateTime;
use tracing::{debug, error, instrument};

use crate::event::store::StoreConnection;
use crate::event::OfflineEvent;
use crate::utils::MonitorError;

/// Runs the offline event query for one poll
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFetcher;

impl EventFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Events strictly newer than `watermark`, ordered by device description.
    ///
    /// The order is a byte-wise comparison done here, so it replaces whatever collation
    /// the store applied to its own `ORDER BY` (uppercase sorts before lowercase).
    /// A failed query is logged and treated as "nothing new this cycle".
    #[instrument(skip(self, connection), level = "debug")]
    pub async fn fetch(
        &self,
        connection: &dyn StoreConnection,
        watermark: NaiveDateTime,
    ) -> Vec<OfflineEvent> {
        match self.try_fetch(connection, watermark).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "Error executing offline event query");
                Vec::new()
            }
        }
    }

    async fn try_fetch(
        &self,
        connection: &dyn StoreConnection,
        watermark: NaiveDateTime,
    ) -> Result<Vec<OfflineEvent>, MonitorError> {
        let mut events = connection
            .fetch_offline_events(watermark)
            .await
            .map_err(MonitorError::FetchFailed)?;

        // Hold the bound and the ordering regardless of the backing store.
        let before = events.len();
        events.retain(|event| event.occurred_at > watermark);
        if events.len() != before {
            debug!(
                dropped = before - events.len(),
                "Discarded rows at or before the watermark"
            );
        }
        events.sort_by(|a, b| a.device_description.cmp(&b.device_description));

        Ok(events)
    }
}
