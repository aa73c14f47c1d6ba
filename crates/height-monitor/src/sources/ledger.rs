//! Chains whose APIs report the head as a plain JSON integer.

use super::{
    HeightSource,
    HttpExecutor,
};
use crate::{
    error::FetchError,
    network::Network,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// EOSIO chain API, `GET /v1/chain/get_info`.
#[derive(Debug)]
pub struct EosioSource {
    http: Arc<HttpExecutor>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChainInfo {
    fork_db_head_block_num: u64,
}

impl EosioSource {
    pub fn new(http: Arc<HttpExecutor>, base_url: String) -> Self {
        let url = format!("{}/v1/chain/get_info", base_url.trim_end_matches('/'));
        Self { http, url }
    }
}

#[async_trait]
impl HeightSource for EosioSource {
    #[instrument(name = "eosio::fetch_height", skip_all, fields(network = %network.symbol), level = "debug")]
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError> {
        self.http
            .get_json(&self.url, |info: ChainInfo| Ok(info.fork_db_head_block_num))
            .await
    }

    fn name(&self) -> &'static str {
        "eosio"
    }
}

/// Ripple data API, `GET /v2/ledgers`.
#[derive(Debug)]
pub struct RippleSource {
    http: Arc<HttpExecutor>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Ledgers {
    ledger: Ledger,
}

#[derive(Debug, Deserialize)]
struct Ledger {
    ledger_index: u64,
}

impl RippleSource {
    pub fn new(http: Arc<HttpExecutor>, base_url: String) -> Self {
        let url = format!("{}/v2/ledgers", base_url.trim_end_matches('/'));
        Self { http, url }
    }
}

#[async_trait]
impl HeightSource for RippleSource {
    #[instrument(name = "ripple::fetch_height", skip_all, fields(network = %network.symbol), level = "debug")]
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError> {
        self.http
            .get_json(&self.url, |ledgers: Ledgers| Ok(ledgers.ledger.ledger_index))
            .await
    }

    fn name(&self) -> &'static str {
        "ripple"
    }
}
