use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use height_monitor::{
    Config,
    cli::Args,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use monitor_utils::spawn_shutdown_listener;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::resolve(args).context("failed to resolve configuration")?;

    PrometheusBuilder::new()
        .with_http_listener(config.metrics_addr)
        .install()
        .with_context(|| {
            format!(
                "failed to install prometheus exporter on {}",
                config.metrics_addr
            )
        })?;
    info!(metrics_addr = %config.metrics_addr, "Prometheus exporter listening");

    // `shutdown_tx` lives until `run` returns, so the channel only closes
    // after the monitor has stopped.
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let _listener = spawn_shutdown_listener(&shutdown_tx);

    height_monitor::run(config, shutdown_rx)
        .await
        .context("height monitor terminated unexpectedly")?;

    info!("Height monitor shutdown gracefully");
    drop(shutdown_tx);
    Ok(())
}
