//! SQL implementation of the event store contracts
//!
//! Uses raw statements through SeaORM; the arcade schema (`game_swipers`, `game_log`,
//! `game_events`, `users`, `swiper_units`) is read-only from the monitor's side.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, QueryResult, Statement};
use std::fmt;
use tracing::debug;

use crate::config::{establish_connection, ConfigError, DatabaseConfig};
use crate::event::store::{EventStore, StoreConnection, StoreResult};
use crate::event::OfflineEvent;
use crate::utils::StoreError;

/// Game log comment prefix that marks a swiper going offline
pub const OFFLINE_COMMENT_PATTERN: &str = "Swiper placed Offline%";

/// `game_events.event_type` for a swiper status change
pub const OFFLINE_EVENT_TYPE: i32 = 44;

/// Opens connections from a prepared URL
#[derive(Clone)]
pub struct SqlEventStore {
    url: String,
    backend: DbBackend,
}

impl SqlEventStore {
    pub fn new(url: impl Into<String>, backend: DbBackend) -> Self {
        Self {
            url: url.into(),
            backend,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.connection_url()?, config.backend()?))
    }

    pub fn backend(&self) -> DbBackend {
        self.backend
    }
}

impl fmt::Debug for SqlEventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The URL embeds credentials.
        f.debug_struct("SqlEventStore")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStore for SqlEventStore {
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        let db = establish_connection(&self.url).await?;
        Ok(Box::new(SqlConnection::new(db)))
    }
}

/// An open SeaORM connection
#[derive(Debug)]
pub struct SqlConnection {
    db: DatabaseConnection,
}

impl SqlConnection {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StoreConnection for SqlConnection {
    async fn ping(&self) -> StoreResult<()> {
        let backend = self.db.get_database_backend();
        self.db
            .query_one(Statement::from_string(backend, "SELECT 1"))
            .await?;
        Ok(())
    }

    async fn fetch_offline_events(&self, since: NaiveDateTime) -> StoreResult<Vec<OfflineEvent>> {
        let backend = self.db.get_database_backend();
        let statement =
            Statement::from_sql_and_values(backend, offline_events_query(backend), [since.into()]);

        let rows = self.db.query_all(statement).await?;
        debug!(rows = rows.len(), since = %since, "Offline event query returned");

        rows.iter()
            .map(|row| row_to_event(row).map_err(StoreError::from))
            .collect()
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        let SqlConnection { db } = *self;
        db.close().await?;
        Ok(())
    }
}

fn row_to_event(row: &QueryResult) -> Result<OfflineEvent, sea_orm::DbErr> {
    Ok(OfflineEvent {
        device_description: row.try_get("", "device_description")?,
        user_name: row.try_get("", "user_name")?,
        comment: row.try_get("", "comment")?,
        occurred_at: row.try_get("", "occurred_at")?,
        days_offline: row.try_get("", "days_offline")?,
    })
}

/// Rank-and-filter query for the given dialect.
///
/// Comments logged at the same instant for the same game are merged, each game keeps
/// only its newest offline entry (rank 1), and only then is the `occurred_at > ?`
/// bound applied, so a device is reported at most once per poll.
pub fn offline_events_query(backend: DbBackend) -> String {
    let (comment_agg, days_offline, bound) = match backend {
        DbBackend::Postgres => (
            "STRING_AGG(TRIM(comment), ', ')",
            "CAST(CURRENT_DATE - CAST(gl.log_datetime AS DATE) AS BIGINT)",
            "$1",
        ),
        _ => (
            "GROUP_CONCAT(TRIM(comment) SEPARATOR ', ')",
            "CAST(DATEDIFF(CURRENT_TIMESTAMP, gl.log_datetime) AS SIGNED)",
            "?",
        ),
    };

    format!(
        r#"WITH offline_events AS (
    SELECT
        ROW_NUMBER() OVER (PARTITION BY gs.game_id ORDER BY gl.log_datetime DESC) AS row_rank,
        gs.swiper_description AS device_description,
        u.user_name AS user_name,
        gl.comment AS comment,
        gl.log_datetime AS occurred_at,
        {days_offline} AS days_offline
    FROM game_swipers gs
    JOIN (
        SELECT game_id, log_datetime, {comment_agg} AS comment
        FROM game_log
        WHERE comment LIKE '{pattern}'
        GROUP BY game_id, log_datetime
    ) gl ON gs.game_id = gl.game_id
    JOIN game_events ge
        ON ge.game_id = gl.game_id
       AND ge.event_time = gl.log_datetime
    JOIN users u
        ON ge.user_id = u.user_id
    JOIN swiper_units su
        ON su.game_id = gs.game_id
    WHERE gs.retired IS NULL
      AND ge.event_type = {event_type}
      AND su.status = 1
)
SELECT device_description, user_name, comment, occurred_at, days_offline
FROM offline_events
WHERE row_rank = 1 AND occurred_at > {bound}
ORDER BY device_description"#,
        days_offline = days_offline,
        comment_agg = comment_agg,
        pattern = OFFLINE_COMMENT_PATTERN,
        event_type = OFFLINE_EVENT_TYPE,
        bound = bound,
    )
}
