#![doc = include_str!("../README.md")]
#![allow(clippy::missing_errors_doc)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::unreachable)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![warn(clippy::indexing_slicing)]
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::indexing_slicing))]

pub mod cli;
pub mod config;
pub mod divergence;
pub mod error;
mod metrics;
pub mod monitor;
pub mod network;
pub mod orchestrator;
pub mod retry;
pub mod sources;

pub use config::{
    Config,
    Endpoints,
};
pub use divergence::{
    Coverage,
    DivergenceRecord,
    DivergenceReporter,
};
pub use error::{
    DecodeError,
    FetchError,
    PartialBatchError,
};
pub use monitor::HeightMonitor;
pub use network::{
    ChainFamily,
    Network,
    NetworkRegistry,
};
pub use orchestrator::{
    BatchOutcome,
    FetchOrchestrator,
    HeightBatch,
    HeightReading,
};
pub use retry::RetryPolicy;
pub use sources::{
    HeightSource,
    HttpExecutor,
    SourceKind,
    SourceRegistry,
};

use anyhow::{
    Context,
    Result,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Run the height monitor until `shutdown_rx` fires.
///
/// This is the main entry point for running the monitor as a library. The
/// caller is responsible for installing the metrics recorder beforehand.
pub async fn run(config: Config, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let registry = Arc::new(NetworkRegistry::with_disabled(&config.disabled_networks));
    let http = Arc::new(
        HttpExecutor::new(config.request_timeout, config.retry)
            .context("failed to build HTTP client")?,
    );
    let sources = Arc::new(SourceRegistry::from_endpoints(
        &registry,
        &config.endpoints,
        &config.api_key,
        http,
    ));

    info!(
        environment = %config.environment,
        networks = ?registry.enabled_symbols(),
        check_interval = ?config.check_interval,
        "Starting height monitor"
    );

    let orchestrator = FetchOrchestrator::new(registry.clone(), sources, config.max_concurrency);
    let reporter = DivergenceReporter::new(config.environment.clone());
    let monitor = HeightMonitor::new(registry, orchestrator, reporter, config.check_interval);

    monitor.run(shutdown_rx).await;
    Ok(())
}
