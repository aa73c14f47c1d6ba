//! Prometheus metrics for the height monitor itself.
//!
//! Divergence gauges are emitted by [`crate::divergence`]; this module covers
//! the monitor's own health.
//!
//! ## Metrics recorded
//!
//! ### Gauges
//! - `height_monitor_fetched_height{source,network}`: Last height fetched per source
//!
//! ### Histograms
//! - `height_monitor_tick_duration_seconds`: Wall-clock time of one fetch and compare pass
//!
//! ### Counters
//! - `height_monitor_ticks_total`: Completed passes
//! - `height_monitor_fetch_failures_total{source,network}`: Networks whose fetch failed
//! - `height_monitor_missing_heights_total{source,network}`: Divergences computed against a missing height

#![allow(clippy::cast_precision_loss)]

use crate::sources::SourceKind;
use metrics::{
    counter,
    gauge,
    histogram,
};
use std::time::Duration;

pub fn record_fetched_height(source: SourceKind, network: &'static str, height: u64) {
    gauge!(
        "height_monitor_fetched_height",
        "source" => source.as_str(),
        "network" => network
    )
    .set(height as f64);
}

pub fn record_fetch_failure(source: SourceKind, network: &'static str) {
    counter!(
        "height_monitor_fetch_failures_total",
        "source" => source.as_str(),
        "network" => network
    )
    .increment(1);
}

pub fn record_missing_height(source: SourceKind, network: &'static str) {
    counter!(
        "height_monitor_missing_heights_total",
        "source" => source.as_str(),
        "network" => network
    )
    .increment(1);
}

pub fn record_tick(duration: Duration) {
    histogram!("height_monitor_tick_duration_seconds").record(duration);
    counter!("height_monitor_ticks_total").increment(1);
}
