//! Height divergence between the two sources, exported as one gauge per network.

#![allow(clippy::cast_precision_loss)]

use crate::{
    metrics::record_missing_height,
    network::NetworkRegistry,
    orchestrator::HeightBatch,
    sources::SourceKind,
};
use chrono::{
    DateTime,
    Utc,
};
use metrics::gauge;
use tracing::{
    debug,
    warn,
};

/// Which sides of a comparison had a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Complete,
    MissingPrimary,
    MissingSecondary,
    MissingBoth,
}

impl Coverage {
    fn of(primary: Option<u64>, secondary: Option<u64>) -> Self {
        match (primary, secondary) {
            (Some(_), Some(_)) => Self::Complete,
            (None, Some(_)) => Self::MissingPrimary,
            (Some(_), None) => Self::MissingSecondary,
            (None, None) => Self::MissingBoth,
        }
    }

    pub fn is_complete(&self) -> bool {
        *self == Self::Complete
    }
}

/// Signed divergence of one network at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceRecord {
    pub network: &'static str,
    /// `primary - secondary`, with a missing height counted as zero.
    pub delta: i64,
    pub coverage: Coverage,
    pub observed_at: DateTime<Utc>,
}

/// Signed difference of two heights, saturating at the `i64` bounds.
pub fn height_delta(primary: u64, secondary: u64) -> i64 {
    let delta = i128::from(primary) - i128::from(secondary);
    i64::try_from(delta).unwrap_or(if delta.is_negative() { i64::MIN } else { i64::MAX })
}

/// Compares node proxy heights against indexer heights and emits the gauges.
#[derive(Debug, Clone)]
pub struct DivergenceReporter {
    environment: String,
}

impl DivergenceReporter {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Emit `primary - secondary` for every enabled network.
    ///
    /// A network absent from either batch is compared as height zero. That
    /// keeps the gauge flowing but makes an outage on one side look like the
    /// other side being ahead by its full height, so the returned records carry
    /// a [`Coverage`] and the gap is logged and counted separately.
    pub fn report(
        &self,
        networks: &NetworkRegistry,
        primary: &HeightBatch,
        secondary: &HeightBatch,
    ) -> Vec<DivergenceRecord> {
        let observed_at = Utc::now();

        networks
            .enabled()
            .map(|network| {
                let symbol = network.symbol;
                let primary_height = primary.get(symbol);
                let secondary_height = secondary.get(symbol);
                let coverage = Coverage::of(primary_height, secondary_height);
                let delta =
                    height_delta(primary_height.unwrap_or(0), secondary_height.unwrap_or(0));

                if primary_height.is_none() {
                    record_missing_height(SourceKind::NodeProxy, symbol);
                }
                if secondary_height.is_none() {
                    record_missing_height(SourceKind::Indexer, symbol);
                }
                if coverage.is_complete() {
                    debug!(network = symbol, delta, "Height divergence");
                } else {
                    warn!(
                        network = symbol,
                        delta,
                        coverage = ?coverage,
                        primary = ?primary_height,
                        secondary = ?secondary_height,
                        "Height divergence computed against a missing height"
                    );
                }

                gauge!(symbol, "environment" => self.environment.clone()).set(delta as f64);

                DivergenceRecord {
                    network: symbol,
                    delta,
                    coverage,
                    observed_at,
                }
            })
            .collect()
    }
}
