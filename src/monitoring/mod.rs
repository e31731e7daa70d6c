//! Monitoring module
//!
//! - Health checks against the event store
//! - Payload formatting and Slack delivery through a bounded worker pool
//! - The poll loop that ties them together

pub mod dispatcher;
pub mod formatter;
pub mod health;
pub mod monitor_loop;
pub mod sink;
pub mod slack_alert;
pub mod watermark;

pub use dispatcher::{DispatchHandle, NotificationDispatcher};
pub use formatter::{format_notification, NotificationPayload, PayloadField, ALERT_HEADER};
pub use health::HealthChecker;
pub use monitor_loop::{CycleOutcome, MonitorLoop, MonitorState};
pub use sink::NotificationSink;
pub use slack_alert::SlackAlert;
pub use watermark::Watermark;
