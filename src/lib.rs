pub mod config;
pub mod event;
pub mod metrics;
pub mod monitoring;
pub mod retry;
pub mod shutdown;
pub mod state;
pub mod utils;

pub use config::AppConfig;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use monitoring::MonitorLoop;
pub use state::MonitorContext;
pub use utils::MonitorError;
