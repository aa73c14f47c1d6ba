//! Tendermint based chains, which report heights as decimal strings.

use super::{
    HeightSource,
    HttpExecutor,
};
use crate::{
    error::{
        DecodeError,
        FetchError,
    },
    network::Network,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

fn parse_decimal(field: &'static str, value: String) -> Result<u64, DecodeError> {
    value.trim().parse::<u64>().map_err(|source| {
        DecodeError::InvalidNumber {
            field,
            value,
            source,
        }
    })
}

/// Cosmos SDK light client daemon, `GET /blocks/latest`.
#[derive(Debug)]
pub struct CosmosSdkSource {
    http: Arc<HttpExecutor>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    block: Block,
}

#[derive(Debug, Deserialize)]
struct Block {
    header: Header,
}

#[derive(Debug, Deserialize)]
struct Header {
    height: String,
}

impl CosmosSdkSource {
    pub fn new(http: Arc<HttpExecutor>, base_url: String) -> Self {
        let url = format!("{}/blocks/latest", base_url.trim_end_matches('/'));
        Self { http, url }
    }
}

#[async_trait]
impl HeightSource for CosmosSdkSource {
    #[instrument(name = "cosmos_sdk::fetch_height", skip_all, fields(network = %network.symbol), level = "debug")]
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError> {
        self.http
            .get_json(&self.url, |latest: LatestBlock| {
                parse_decimal("block.header.height", latest.block.header.height)
            })
            .await
    }

    fn name(&self) -> &'static str {
        "cosmos_sdk"
    }
}

/// Tendermint RPC node, `GET /status`.
#[derive(Debug)]
pub struct TendermintStatusSource {
    http: Arc<HttpExecutor>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    result: StatusResult,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: String,
}

impl TendermintStatusSource {
    pub fn new(http: Arc<HttpExecutor>, base_url: String) -> Self {
        let url = format!("{}/status", base_url.trim_end_matches('/'));
        Self { http, url }
    }
}

#[async_trait]
impl HeightSource for TendermintStatusSource {
    #[instrument(name = "tendermint_status::fetch_height", skip_all, fields(network = %network.symbol), level = "debug")]
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError> {
        self.http
            .get_json(&self.url, |status: Status| {
                parse_decimal(
                    "result.sync_info.latest_block_height",
                    status.result.sync_info.latest_block_height,
                )
            })
            .await
    }

    fn name(&self) -> &'static str {
        "tendermint_status"
    }
}
