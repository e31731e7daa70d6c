//! Bounded worker pool for notification delivery
//!
//! Submissions are queued and picked up by a fixed number of workers, so sends run
//! concurrently with each other and with the poll loop. Each submission gets its own
//! result channel; the loop ignores it, tests await it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::metrics::MetricsCollector;
use crate::monitoring::formatter::NotificationPayload;
use crate::monitoring::sink::NotificationSink;
use crate::retry::RetryPolicy;
use crate::utils::MonitorError;

struct DispatchJob {
    payload: NotificationPayload,
    reply: oneshot::Sender<bool>,
}

/// Delivery outcome of one submission
#[derive(Debug)]
pub struct DispatchHandle {
    rx: oneshot::Receiver<bool>,
}

impl DispatchHandle {
    /// `true` when the notification was delivered. A job dropped without running
    /// (pool already drained) counts as not delivered.
    pub async fn delivered(self) -> bool {
        self.rx.await.unwrap_or(false)
    }
}

/// Fixed-size pool of notification workers
pub struct NotificationDispatcher {
    queue: Option<mpsc::UnboundedSender<DispatchJob>>,
    workers: Vec<JoinHandle<()>>,
}

impl NotificationDispatcher {
    /// Spawn `workers` delivery tasks (at least one) on the current runtime.
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        policy: RetryPolicy,
        workers: usize,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<DispatchJob>();
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                let sink = Arc::clone(&sink);
                let metrics = Arc::clone(&metrics);
                tokio::spawn(run_worker(worker_id, rx, sink, policy, metrics))
            })
            .collect();

        Self {
            queue: Some(tx),
            workers,
        }
    }

    /// Queue a notification without waiting for delivery.
    pub fn submit(&self, payload: NotificationPayload) -> DispatchHandle {
        let (reply, rx) = oneshot::channel();
        match &self.queue {
            Some(queue) => {
                if let Err(rejected) = queue.send(DispatchJob { payload, reply }) {
                    warn!("Dispatch pool is closed, notification dropped");
                    drop(rejected);
                }
            }
            None => warn!("Dispatch pool is closed, notification dropped"),
        }
        DispatchHandle { rx }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting work and wait for queued and in-flight sends to finish.
    pub async fn drain(&mut self) {
        self.queue.take();
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                error!(error = %e, "Dispatch worker terminated abnormally");
            }
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        // Closing the queue lets idle workers exit; in-flight sends finish on their own.
        self.queue.take();
    }
}

/// Pull jobs off the shared queue until it closes.
async fn run_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<DispatchJob>>>,
    sink: Arc<dyn NotificationSink>,
    policy: RetryPolicy,
    metrics: Arc<MetricsCollector>,
) {
    loop {
        // The lock is released at the end of this statement, before delivery starts.
        let job = rx.lock().await.recv().await;
        let Some(job) = job else {
            debug!(worker_id, "Dispatch queue closed, worker exiting");
            break;
        };
        let delivered = deliver(sink.as_ref(), &policy, &metrics, &job.payload).await;
        // The submitter may not be listening.
        let _ = job.reply.send(delivered);
    }
}

/// Send with retry and record exactly one outcome in the metrics.
async fn deliver(
    sink: &dyn NotificationSink,
    policy: &RetryPolicy,
    metrics: &MetricsCollector,
    payload: &NotificationPayload,
) -> bool {
    let result = policy
        .run("slack_notify", |_| sink.send(payload))
        .await
        .map_err(|exhausted| MonitorError::DispatchExhausted {
            attempts: exhausted.attempts,
            source: exhausted.last_error,
        });

    match result {
        Ok(()) => {
            metrics.record_notification_sent();
            info!(
                game = payload.field("Game").unwrap_or("-"),
                "Notification delivered"
            );
            true
        }
        Err(e) => {
            metrics.record_notification_failed();
            error!(
                game = payload.field("Game").unwrap_or("-"),
                error = %e,
                "Notification dropped"
            );
            false
        }
    }
}
