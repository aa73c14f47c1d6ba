//! The tick loop driving fetch and compare passes.

use crate::{
    divergence::{
        DivergenceRecord,
        DivergenceReporter,
    },
    metrics,
    network::NetworkRegistry,
    orchestrator::FetchOrchestrator,
    sources::SourceKind,
};
use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::broadcast::{
        self,
        error::RecvError,
    },
    time::MissedTickBehavior,
};
use tracing::{
    error,
    info,
    instrument,
    warn,
};

/// Default interval between passes.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Runs one fetch and compare pass per interval until told to stop.
#[derive(Debug)]
pub struct HeightMonitor {
    networks: Arc<NetworkRegistry>,
    orchestrator: FetchOrchestrator,
    reporter: DivergenceReporter,
    interval: Duration,
}

impl HeightMonitor {
    pub fn new(
        networks: Arc<NetworkRegistry>,
        orchestrator: FetchOrchestrator,
        reporter: DivergenceReporter,
        interval: Duration,
    ) -> Self {
        Self {
            networks,
            orchestrator,
            reporter,
            interval,
        }
    }

    /// Tick forever, or until `shutdown_rx` fires. A pass that is in progress
    /// when the signal arrives is finished first.
    ///
    /// A closed channel means nobody can ask for shutdown any more; the loop
    /// keeps ticking until the process exits.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_open = true;

        loop {
            tokio::select! {
                biased;
                signal = shutdown_rx.recv(), if shutdown_open => match signal {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        info!("Shutdown signal received, stopping height monitor");
                        return;
                    }
                    Err(RecvError::Closed) => {
                        warn!("Shutdown channel closed, monitoring until the process exits");
                        shutdown_open = false;
                    }
                },
                _ = ticker.tick() => {
                    self.check_heights().await;
                }
            }
        }
    }

    /// One pass: fetch both sources one after the other, then compare.
    ///
    /// Fetch failures are logged and never abort the pass; whatever heights
    /// were collected are still compared.
    #[instrument(name = "height_monitor::check_heights", skip(self), level = "debug")]
    pub async fn check_heights(&self) -> Vec<DivergenceRecord> {
        let started_at = Instant::now();

        let primary = self.orchestrator.fetch_all(SourceKind::NodeProxy).await;
        if let Some(err) = &primary.error {
            error!(
                error = %err,
                cause = %err.first,
                "Unable to fetch every height from the node proxies"
            );
        }

        let secondary = self.orchestrator.fetch_all(SourceKind::Indexer).await;
        if let Some(err) = &secondary.error {
            error!(
                error = %err,
                cause = %err.first,
                "Unable to fetch every height from the indexer"
            );
        }

        let records = self
            .reporter
            .report(&self.networks, &primary.batch, &secondary.batch);

        let duration = started_at.elapsed();
        metrics::record_tick(duration);
        info!(
            networks = records.len(),
            primary_heights = primary.batch.len(),
            secondary_heights = secondary.batch.len(),
            duration = ?duration,
            "Compared block heights"
        );

        records
    }
}
