use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::debug;

/// Upper bound for a single connection attempt; retries are layered on top.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Open a single-connection pool against the event store.
///
/// The monitor never shares a connection across cycles, so the pool is capped at one
/// connection and closed by the caller once the cycle is done.
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(1)
        .min_connections(1)
        .connect_timeout(CONNECT_TIMEOUT)
        .acquire_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    debug!("Opened event store connection.");

    Ok(db)
}
