//! Event store access
//!
//! - Offline event record type
//! - Store/connection contracts and the SQL implementation
//! - Retrying connection manager and the watermark-bounded fetcher

pub mod connection;
pub mod event_types;
pub mod fetcher;
pub mod sql_store;
pub mod store;

pub use connection::ConnectionManager;
pub use event_types::OfflineEvent;
pub use fetcher::EventFetcher;
pub use sql_store::{SqlConnection, SqlEventStore};
pub use store::{EventStore, StoreConnection, StoreResult};
