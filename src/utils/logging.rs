//! Logging initialization
//!
//! Structured JSON logs go to stdout and to a daily-rolling file at the same time.

use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// The level is taken from `RUST_LOG`, defaulting to `info,swiper_monitor=debug`.
/// Files are written to `LOG_DIR` (default `logs/`) as `monitor.log.YYYY-MM-DD`.
///
/// The returned `WorkerGuard` must be held by `main`, otherwise buffered lines are lost
/// when the process exits.
pub fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

    let file_appender = rolling::daily(&log_dir, "monitor.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swiper_monitor=debug"));

    let init = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
    if let Err(e) = init {
        // The monitor still runs without structured logs.
        eprintln!("Failed to initialize tracing: {e}");
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use uuid::Uuid;

    #[test]
    fn should_keep_running_when_subscriber_is_already_set() {
        // Arrange
        let dir = temp_dir().join(format!("test_logs_{}", Uuid::new_v4()));
        std::env::set_var("LOG_DIR", &dir);
        let _first = init_logging();

        // Act
        let _second = init_logging();

        // Assert
        tracing::info!("still logging after a second init");
        std::fs::remove_dir_all(&dir).ok();
    }
}
