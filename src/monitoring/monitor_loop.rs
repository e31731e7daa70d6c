//! Poll loop driving health check, fetch, dispatch and metrics persistence
//!
//! One cycle walks `HealthChecking → Connecting → Fetching → Dispatching → Persisting`,
//! bailing out to `Sleeping` when the store is unreachable. The loop then sleeps for
//! the poll interval or until shutdown, whichever comes first.
//!
//! The watermark advances as soon as a batch is handed to the dispatcher, not when
//! delivery completes. A crash between the two loses those notifications for good:
//! the next process starts from a fresh watermark and never re-reads them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, instrument, warn};

use crate::config::MonitorSettings;
use crate::event::{ConnectionManager, EventFetcher, EventStore, OfflineEvent};
use crate::monitoring::dispatcher::{DispatchHandle, NotificationDispatcher};
use crate::monitoring::formatter::format_notification;
use crate::monitoring::health::HealthChecker;
use crate::monitoring::sink::NotificationSink;
use crate::monitoring::watermark::Watermark;
use crate::retry::RetryPolicy;
use crate::state::MonitorContext;
use crate::utils::MonitorError;

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    HealthChecking,
    Connecting,
    Fetching,
    Dispatching,
    Persisting,
    Sleeping,
    ShuttingDown,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Idle => "idle",
            MonitorState::HealthChecking => "health_checking",
            MonitorState::Connecting => "connecting",
            MonitorState::Fetching => "fetching",
            MonitorState::Dispatching => "dispatching",
            MonitorState::Persisting => "persisting",
            MonitorState::Sleeping => "sleeping",
            MonitorState::ShuttingDown => "shutting_down",
        };
        f.write_str(name)
    }
}

/// Result of one pass through the cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Store failed the health check; nothing was fetched
    HealthCheckFailed,
    /// Health check passed but the fetch connection could not be opened
    ConnectFailed,
    /// Query ran; one dispatch handle per event, in fetch order
    Polled {
        events: usize,
        dispatched: Vec<DispatchHandle>,
    },
}

/// The monitoring engine
pub struct MonitorLoop {
    ctx: MonitorContext,
    health: HealthChecker,
    connections: ConnectionManager,
    fetcher: EventFetcher,
    dispatcher: NotificationDispatcher,
    watermark: Watermark,
    poll_interval: Duration,
    metrics_path: PathBuf,
    state: MonitorState,
}

impl MonitorLoop {
    /// Wire the components. Spawns the dispatch workers, so a runtime must be running.
    pub fn new(
        ctx: MonitorContext,
        store: Arc<dyn EventStore>,
        sink: Arc<dyn NotificationSink>,
        settings: &MonitorSettings,
    ) -> Self {
        let policy = RetryPolicy::new(settings.max_retries, settings.retry_delay);
        let connections = ConnectionManager::new(store, policy, Arc::clone(&ctx.metrics));
        let health = HealthChecker::new(connections.clone(), Arc::clone(&ctx.metrics));
        let dispatcher = NotificationDispatcher::new(
            sink,
            policy,
            settings.dispatch_workers,
            Arc::clone(&ctx.metrics),
        );

        Self {
            ctx,
            health,
            connections,
            fetcher: EventFetcher::new(),
            dispatcher,
            watermark: Watermark::at_startup(settings.watermark_grace),
            poll_interval: settings.poll_interval,
            metrics_path: settings.metrics_path.clone(),
            state: MonitorState::Idle,
        }
    }

    /// Replace the startup watermark
    pub fn with_watermark(mut self, watermark: Watermark) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn watermark(&self) -> NaiveDateTime {
        self.watermark.current()
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Refuse to start against an unreachable store.
    pub async fn startup_check(&self) -> Result<(), MonitorError> {
        if self.health.check().await {
            Ok(())
        } else {
            Err(MonitorError::FatalStartupFailure)
        }
    }

    /// Run cycles until shutdown, then drain and persist.
    #[instrument(skip(self), level = "info")]
    pub async fn run(&mut self) {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            watermark = %self.watermark.current(),
            "Starting monitoring of embed swiper offline events"
        );

        while !self.ctx.shutdown.is_triggered() {
            let outcome = self.run_cycle().await;
            debug!(?outcome, "Cycle finished");

            self.transition(MonitorState::Sleeping);
            if self.sleep_or_shutdown().await {
                break;
            }
        }

        self.shut_down().await;
    }

    /// One pass from `HealthChecking` through `Persisting`.
    ///
    /// Failures before the fetch skip persistence; the caller goes straight to sleep.
    #[instrument(skip(self), level = "debug")]
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.transition(MonitorState::HealthChecking);
        if !self.health.check().await {
            error!("Health check failed. Waiting before retry...");
            return CycleOutcome::HealthCheckFailed;
        }

        self.transition(MonitorState::Connecting);
        let connection = match self.connections.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                error!(error = %e, "Could not open fetch connection. Waiting before retry...");
                return CycleOutcome::ConnectFailed;
            }
        };

        self.transition(MonitorState::Fetching);
        let events = self
            .fetcher
            .fetch(connection.as_ref(), self.watermark.current())
            .await;
        if let Err(e) = connection.close().await {
            warn!(error = %e, "Failed to close fetch connection");
        }

        let dispatched = if events.is_empty() {
            Vec::new()
        } else {
            self.transition(MonitorState::Dispatching);
            self.dispatch(&events)
        };

        self.transition(MonitorState::Persisting);
        self.persist_metrics().await;

        CycleOutcome::Polled {
            events: events.len(),
            dispatched,
        }
    }

    /// Hand every event to the pool and move the watermark to the batch maximum.
    fn dispatch(&mut self, events: &[OfflineEvent]) -> Vec<DispatchHandle> {
        let previous = self.watermark.current();

        let handles = events
            .iter()
            .map(|event| {
                self.watermark.advance(event.occurred_at);
                self.dispatcher.submit(format_notification(event))
            })
            .collect();

        info!(
            events = events.len(),
            from = %previous,
            to = %self.watermark.current(),
            "New offline events submitted for notification"
        );
        handles
    }

    /// `true` when shutdown was observed before the poll interval elapsed.
    async fn sleep_or_shutdown(&self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => false,
            _ = self.ctx.shutdown.wait() => {
                info!("Shutdown observed while sleeping");
                true
            }
        }
    }

    async fn shut_down(&mut self) {
        self.transition(MonitorState::ShuttingDown);
        info!("Waiting for in-flight notifications to finish");
        self.dispatcher.drain().await;
        self.persist_metrics().await;
        info!("Monitor loop stopped");
    }

    async fn persist_metrics(&self) {
        if let Err(e) = self.ctx.metrics.persist(&self.metrics_path).await {
            error!(error = %e, "Failed to save metrics");
        }
    }

    fn transition(&mut self, next: MonitorState) {
        debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }
}
