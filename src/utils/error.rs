use std::path::PathBuf;

use crate::config::ConfigError;

/// Monitor error taxonomy
///
/// Only `ConfigInvalid` and `FatalStartupFailure` end the process; every other
/// variant is logged, counted and absorbed by the component that owns the retry.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Event store unreachable after {attempts} attempts: {source}")]
    ConnectionExhausted {
        attempts: u32,
        #[source]
        source: StoreError,
    },
    #[error("Health check failed: {0}")]
    HealthCheckFailed(#[source] StoreError),
    #[error("Offline event query failed: {0}")]
    FetchFailed(#[source] StoreError),
    #[error("Notification not delivered after {attempts} attempts: {source}")]
    DispatchExhausted {
        attempts: u32,
        #[source]
        source: SinkError,
    },
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(#[from] ConfigError),
    #[error("Initial health check failed. Check configuration and connectivity.")]
    FatalStartupFailure,
    #[error("Failed to write metrics to {path}: {source}")]
    MetricsPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize metrics: {0}")]
    MetricsSerialize(#[from] serde_json::Error),
}

impl MonitorError {
    /// Whether this error must stop the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::ConfigInvalid(_) | MonitorError::FatalStartupFailure
        )
    }
}

/// Event store error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

/// Notification transport error
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Slack request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Slack returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Slack API error: {0}")]
    Api(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_startup_errors_as_fatal() {
        assert!(MonitorError::FatalStartupFailure.is_fatal());
        let invalid = MonitorError::ConfigInvalid(ConfigError::Missing("DB_HOST"));
        assert!(invalid.is_fatal());
    }

    #[test]
    fn should_classify_steady_state_errors_as_soft() {
        let exhausted = MonitorError::ConnectionExhausted {
            attempts: 3,
            source: StoreError::Unavailable("refused".to_string()),
        };
        let fetch = MonitorError::FetchFailed(StoreError::Unavailable("timeout".to_string()));
        let dispatch = MonitorError::DispatchExhausted {
            attempts: 3,
            source: SinkError::Api("channel_not_found".to_string()),
        };

        assert!(!exhausted.is_fatal());
        assert!(!fetch.is_fatal());
        assert!(!dispatch.is_fatal());
    }

    #[test]
    fn should_include_attempts_in_message() {
        let error = MonitorError::ConnectionExhausted {
            attempts: 3,
            source: StoreError::Unavailable("refused".to_string()),
        };

        let message = error.to_string();

        assert!(message.contains("3 attempts"));
        assert!(message.contains("refused"));
    }
}
