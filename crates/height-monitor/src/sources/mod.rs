//! Height sources and the adapters that speak each wire format.
//!
//! Every adapter implements [`HeightSource`]: given a network, return the
//! height its upstream currently reports. Adapters are registered in a
//! [`SourceRegistry`] keyed by source kind and network symbol, with a
//! per-kind fallback for networks that are not registered explicitly.

mod evm;
mod http;
mod indexer;
mod ledger;
mod tendermint;
mod utxo;

pub use evm::EvmProxySource;
pub use http::HttpExecutor;
pub use indexer::IndexerSource;
pub use ledger::{
    EosioSource,
    RippleSource,
};
pub use tendermint::{
    CosmosSdkSource,
    TendermintStatusSource,
};
pub use utxo::UtxoExplorerSource;

use crate::{
    config::Endpoints,
    error::FetchError,
    network::{
        ChainFamily,
        Network,
        NetworkRegistry,
    },
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt::{
        self,
        Debug,
    },
    sync::Arc,
};

/// One of the two independently operated systems whose heights are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// Block explorers and node proxies queried network by network. Batch A.
    NodeProxy,
    /// The indexing service reporting the last processed block per network. Batch B.
    Indexer,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NodeProxy => "node_proxy",
            Self::Indexer => "indexer",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch the current block height of a network from one upstream.
///
/// Implementations are shared across concurrent workers and must be
/// thread-safe. Retrying is the implementation's concern, so multi-request
/// protocols can give each request its own budget.
#[async_trait]
pub trait HeightSource: Debug + Send + Sync {
    /// Returns the height the upstream currently reports for `network`.
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Whether [`fetch_heights`](Self::fetch_heights) answers every network
    /// from a single upstream call. The orchestrator then gives all networks
    /// served by this source one shared worker.
    fn batched(&self) -> bool {
        false
    }

    /// Heights for `networks`, one result per network in the same order.
    async fn fetch_heights(&self, networks: &[Network]) -> Vec<Result<u64, FetchError>> {
        let mut heights = Vec::with_capacity(networks.len());
        for network in networks {
            heights.push(self.fetch_height(network).await);
        }
        heights
    }
}

/// Maps `(source kind, network symbol)` to the adapter that serves it.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    adapters: HashMap<(SourceKind, &'static str), Arc<dyn HeightSource>>,
    fallbacks: HashMap<SourceKind, Arc<dyn HeightSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire up the production adapters for every network in `networks`.
    ///
    /// The node proxy side routes on [`ChainFamily`], with the UTXO explorer as
    /// fallback. The indexer serves every network from one endpoint.
    pub fn from_endpoints(
        networks: &NetworkRegistry,
        endpoints: &Endpoints,
        api_key: &str,
        http: Arc<HttpExecutor>,
    ) -> Self {
        let evm: Arc<dyn HeightSource> = Arc::new(EvmProxySource::new(
            http.clone(),
            endpoints.coinquery_eth_url.clone(),
            api_key,
        ));
        let cosmos: Arc<dyn HeightSource> = Arc::new(CosmosSdkSource::new(
            http.clone(),
            endpoints.cosmos_url.clone(),
        ));
        let thorchain: Arc<dyn HeightSource> = Arc::new(CosmosSdkSource::new(
            http.clone(),
            endpoints.thorchain_url.clone(),
        ));
        let binance: Arc<dyn HeightSource> = Arc::new(TendermintStatusSource::new(
            http.clone(),
            endpoints.binance_url.clone(),
        ));
        let fio: Arc<dyn HeightSource> =
            Arc::new(EosioSource::new(http.clone(), endpoints.fio_url.clone()));
        let ripple: Arc<dyn HeightSource> =
            Arc::new(RippleSource::new(http.clone(), endpoints.ripple_url.clone()));
        let utxo: Arc<dyn HeightSource> = Arc::new(UtxoExplorerSource::new(
            http.clone(),
            endpoints.coinquery_url.clone(),
            api_key,
        ));
        let indexer: Arc<dyn HeightSource> = Arc::new(IndexerSource::new(
            http,
            endpoints.watchtower_base_url.clone(),
        ));

        let mut registry = Self::new()
            .with_fallback(SourceKind::NodeProxy, utxo)
            .with_fallback(SourceKind::Indexer, indexer);

        for network in networks.enabled() {
            let adapter = match (network.family, network.symbol) {
                (ChainFamily::Evm, _) => evm.clone(),
                // Thorchain runs its own cosmos-sdk daemon.
                (ChainFamily::CosmosSdk, "RUNE") => thorchain.clone(),
                (ChainFamily::CosmosSdk, _) => cosmos.clone(),
                (ChainFamily::Tendermint, _) => binance.clone(),
                (ChainFamily::Eosio, _) => fio.clone(),
                (ChainFamily::Ripple, _) => ripple.clone(),
                (ChainFamily::Utxo, _) => continue,
            };
            registry.register(SourceKind::NodeProxy, network.symbol, adapter);
        }

        registry
    }

    /// Serve `symbol` on `kind` with `adapter`, replacing any previous one.
    pub fn register(
        &mut self,
        kind: SourceKind,
        symbol: &'static str,
        adapter: Arc<dyn HeightSource>,
    ) -> &mut Self {
        self.adapters.insert((kind, symbol), adapter);
        self
    }

    /// Serve every unregistered network on `kind` with `adapter`.
    pub fn with_fallback(mut self, kind: SourceKind, adapter: Arc<dyn HeightSource>) -> Self {
        self.fallbacks.insert(kind, adapter);
        self
    }

    /// The adapter serving `network` on `kind`, if any.
    pub fn resolve(&self, kind: SourceKind, network: &Network) -> Option<Arc<dyn HeightSource>> {
        self.adapters
            .get(&(kind, network.symbol))
            .or_else(|| self.fallbacks.get(&kind))
            .cloned()
    }
}
