//! Concurrent fan-out of height fetches across every enabled network.

use crate::{
    error::{
        FetchError,
        PartialBatchError,
    },
    metrics,
    network::{
        Network,
        NetworkRegistry,
    },
    sources::{
        HeightSource,
        SourceKind,
        SourceRegistry,
    },
};
use std::{
    collections::{
        BTreeMap,
        HashMap,
        btree_map,
    },
    ptr,
    sync::Arc,
};
use tokio::{
    sync::Semaphore,
    task::{
        self,
        JoinSet,
    },
};
use tracing::{
    debug,
    instrument,
    warn,
};

/// Default upper bound on in-flight fetches per orchestration pass.
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Outcome of one worker: a height or the reason there is none.
#[derive(Debug)]
pub struct HeightReading {
    pub network: &'static str,
    pub height: Result<u64, FetchError>,
}

/// Heights fetched from one source during one tick, keyed by network symbol.
///
/// Only networks whose fetch succeeded are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeightBatch {
    heights: BTreeMap<String, u64>,
}

impl HeightBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, network: impl Into<String>, height: u64) {
        self.heights.insert(network.into(), height);
    }

    pub fn get(&self, network: &str) -> Option<u64> {
        self.heights.get(network).copied()
    }

    pub fn contains(&self, network: &str) -> bool {
        self.heights.contains_key(network)
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, u64> {
        self.heights.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for HeightBatch {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            heights: iter
                .into_iter()
                .map(|(network, height)| (network.into(), height))
                .collect(),
        }
    }
}

/// Successful readings plus the first failure, if any.
///
/// A failing network never removes its siblings' readings from the batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch: HeightBatch,
    pub error: Option<PartialBatchError>,
}

/// Fans out one fetch per enabled network against a single source.
#[derive(Debug, Clone)]
pub struct FetchOrchestrator {
    networks: Arc<NetworkRegistry>,
    sources: Arc<SourceRegistry>,
    max_concurrency: usize,
}

impl FetchOrchestrator {
    pub fn new(
        networks: Arc<NetworkRegistry>,
        sources: Arc<SourceRegistry>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            networks,
            sources,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Fetch every enabled network's height from `kind`.
    ///
    /// Networks served by a batched source share one worker and one upstream
    /// call; every other network gets its own worker. All workers run to
    /// completion. The first failure to be collected is reported; which one
    /// that is among concurrent failures is unspecified.
    #[instrument(name = "orchestrator::fetch_all", skip(self), fields(source = %kind))]
    pub async fn fetch_all(&self, kind: SourceKind) -> BatchOutcome {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = JoinSet::new();
        let mut spawned: HashMap<task::Id, Vec<&'static str>> = HashMap::new();
        let mut batched: Vec<(Arc<dyn HeightSource>, Vec<Network>)> = Vec::new();
        let mut tally = Tally::new(kind);

        for network in self.networks.enabled() {
            tally.attempted += 1;

            let Some(source) = self.sources.resolve(kind, network) else {
                tally.record(
                    network.symbol,
                    Err(FetchError::NoSource {
                        source_kind: kind,
                        network: network.symbol.to_string(),
                    }),
                );
                continue;
            };

            if source.batched() {
                let group = batched
                    .iter_mut()
                    .find(|(shared, _)| ptr::addr_eq(Arc::as_ptr(shared), Arc::as_ptr(&source)));
                match group {
                    Some((_, networks)) => networks.push(network.clone()),
                    None => batched.push((source, vec![network.clone()])),
                }
                continue;
            }

            let network = network.clone();
            let permits = permits.clone();
            let symbol = network.symbol;
            let handle = workers.spawn(async move {
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();
                vec![HeightReading {
                    network: network.symbol,
                    height: source.fetch_height(&network).await,
                }]
            });
            spawned.insert(handle.id(), vec![symbol]);
        }

        for (source, networks) in batched {
            let permits = permits.clone();
            let symbols = networks.iter().map(|network| network.symbol).collect();
            let handle = workers.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let heights = source.fetch_heights(&networks).await;
                networks
                    .iter()
                    .zip(heights)
                    .map(|(network, height)| {
                        HeightReading {
                            network: network.symbol,
                            height,
                        }
                    })
                    .collect::<Vec<_>>()
            });
            spawned.insert(handle.id(), symbols);
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(readings) => {
                    for reading in readings {
                        tally.record(reading.network, reading.height);
                    }
                }
                Err(err) => {
                    let networks = spawned.remove(&err.id()).unwrap_or_default();
                    warn!(networks = ?networks, error = ?err, "Height fetch worker failed");
                    for network in networks {
                        tally.record(network, Err(FetchError::Worker(err.to_string())));
                    }
                }
            }
        }

        tally.finish()
    }
}

/// Accumulates one pass's readings into a batch and a failure summary.
struct Tally {
    kind: SourceKind,
    batch: HeightBatch,
    first_failure: Option<(String, FetchError)>,
    attempted: usize,
    failed: usize,
}

impl Tally {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            batch: HeightBatch::new(),
            first_failure: None,
            attempted: 0,
            failed: 0,
        }
    }

    fn record(&mut self, network: &'static str, height: Result<u64, FetchError>) {
        match height {
            Ok(height) => {
                debug!(network, height, "Fetched height");
                metrics::record_fetched_height(self.kind, network, height);
                self.batch.insert(network, height);
            }
            Err(err) => {
                warn!(
                    network,
                    error = %err,
                    url = ?err.url(),
                    body = ?err.body(),
                    "Failed to fetch height"
                );
                self.failed += 1;
                metrics::record_fetch_failure(self.kind, network);
                if self.first_failure.is_none() {
                    self.first_failure = Some((network.to_string(), err));
                }
            }
        }
    }

    fn finish(self) -> BatchOutcome {
        let Self {
            kind,
            batch,
            first_failure,
            attempted,
            failed,
        } = self;

        let error = first_failure.map(|(network, first)| {
            PartialBatchError {
                source_kind: kind,
                attempted,
                failed,
                network,
                first,
            }
        });

        BatchOutcome { batch, error }
    }
}
