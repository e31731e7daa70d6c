use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use swiper_monitor::config::AppConfig;
use swiper_monitor::event::SqlEventStore;
use swiper_monitor::monitoring::{MonitorLoop, SlackAlert};
use swiper_monitor::shutdown::spawn_signal_listener;
use swiper_monitor::utils::logging::init_logging;
use swiper_monitor::{MonitorContext, MonitorError};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Load .env
    dotenvy::dotenv().ok();

    // 2. Logging
    let _guard = init_logging();

    // 3. Configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %MonitorError::from(e), "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let metrics_path = config.monitor.metrics_path.clone();

    // 4. Monitor
    let ctx = MonitorContext::new();
    let result = run(config, ctx.clone()).await;

    // 5. Final metrics, on every exit path
    finish(&ctx, &metrics_path, result).await
}

async fn run(config: AppConfig, ctx: MonitorContext) -> Result<(), MonitorError> {
    info!(
        driver = %config.database.driver,
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.database,
        protocol_version = %config.database.protocol_version,
        channel = %config.slack.channel,
        poll_interval_secs = config.monitor.poll_interval.as_secs(),
        "Configuration loaded"
    );

    spawn_signal_listener(ctx.shutdown.clone());

    let store = Arc::new(SqlEventStore::from_config(&config.database)?);
    let sink = Arc::new(SlackAlert::from_config(&config.slack));
    let mut monitor = MonitorLoop::new(ctx, store, sink, &config.monitor);

    monitor.startup_check().await?;
    info!("Initial health check passed");

    monitor.run().await;
    Ok(())
}

async fn finish(
    ctx: &MonitorContext,
    metrics_path: &Path,
    result: Result<(), MonitorError>,
) -> ExitCode {
    if let Err(e) = ctx.metrics.persist(metrics_path).await {
        error!(error = %e, "Failed to save final metrics");
    }
    info!("Monitor terminated. Final metrics saved.");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "Monitor stopped with error");
            ExitCode::FAILURE
        }
    }
}
