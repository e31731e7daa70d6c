//! Event store contracts

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::event::OfflineEvent;
use crate::utils::StoreError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Source of store connections
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Open one connection; no retry at this level
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>>;
}

/// One open connection, owned by a single cycle
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Trivial round-trip query
    async fn ping(&self) -> StoreResult<()>;

    /// Newest unresolved offline event per device with `occurred_at > since`,
    /// ordered by device description
    async fn fetch_offline_events(&self, since: NaiveDateTime) -> StoreResult<Vec<OfflineEvent>>;

    /// Release the connection
    async fn close(self: Box<Self>) -> StoreResult<()>;
}
