//! Static table of monitored networks.

use std::{
    collections::BTreeSet,
    fmt,
};

/// Wire family a network's primary source speaks.
///
/// The family decides which adapter the primary source uses; the secondary
/// indexer reports every network through one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainFamily {
    /// `eth_blockNumber` proxy returning a `0x`-prefixed hex quantity.
    Evm,
    /// Cosmos SDK light client daemon, `block.header.height` as a decimal string.
    CosmosSdk,
    /// Tendermint RPC `/status`, `result.sync_info.latest_block_height` as a decimal string.
    Tendermint,
    /// EOSIO `get_info`, plain integer `fork_db_head_block_num`.
    Eosio,
    /// Ripple data API, plain integer `ledger.ledger_index`.
    Ripple,
    /// Insight-style explorer, latest block hash then block lookup.
    Utxo,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::CosmosSdk => "cosmos_sdk",
            Self::Tendermint => "tendermint",
            Self::Eosio => "eosio",
            Self::Ripple => "ripple",
            Self::Utxo => "utxo",
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub symbol: &'static str,
    pub family: ChainFamily,
    pub enabled: bool,
}

impl Network {
    pub const fn new(symbol: &'static str, family: ChainFamily) -> Self {
        Self {
            symbol,
            family,
            enabled: true,
        }
    }
}

/// Networks monitored by default. Anything not explicitly classified speaks the
/// two-step UTXO protocol.
pub const DEFAULT_NETWORKS: &[Network] = &[
    Network::new("RUNE", ChainFamily::CosmosSdk),
    Network::new("ATOM", ChainFamily::CosmosSdk),
    Network::new("BTC", ChainFamily::Utxo),
    Network::new("BCH", ChainFamily::Utxo),
    Network::new("DGB", ChainFamily::Utxo),
    Network::new("LTC", ChainFamily::Utxo),
    Network::new("DOGE", ChainFamily::Utxo),
    Network::new("DASH", ChainFamily::Utxo),
    Network::new("ETH", ChainFamily::Evm),
    Network::new("FIO", ChainFamily::Eosio),
    Network::new("XRP", ChainFamily::Ripple),
    Network::new("BNB", ChainFamily::Tendermint),
];

/// Read-only set of networks, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    networks: Vec<Network>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORKS.to_vec())
    }
}

impl NetworkRegistry {
    pub fn new(networks: Vec<Network>) -> Self {
        Self { networks }
    }

    /// The default table with every symbol in `disabled` switched off.
    /// Matching is case-insensitive; unknown symbols are ignored.
    pub fn with_disabled<S: AsRef<str>>(disabled: &[S]) -> Self {
        let networks = DEFAULT_NETWORKS
            .iter()
            .cloned()
            .map(|mut network| {
                if disabled
                    .iter()
                    .any(|symbol| symbol.as_ref().trim().eq_ignore_ascii_case(network.symbol))
                {
                    network.enabled = false;
                }
                network
            })
            .collect();
        Self::new(networks)
    }

    /// Every enabled network, in table order.
    pub fn enabled(&self) -> impl Iterator<Item = &Network> {
        self.networks.iter().filter(|network| network.enabled)
    }

    pub fn enabled_symbols(&self) -> BTreeSet<&'static str> {
        self.enabled().map(|network| network.symbol).collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&Network> {
        self.networks.iter().find(|network| network.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
