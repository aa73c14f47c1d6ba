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
use monitor_utils::decode_hex_quantity;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// Etherscan-style proxy answering `eth_blockNumber` with a hex quantity.
#[derive(Debug)]
pub struct EvmProxySource {
    http: Arc<HttpExecutor>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct BlockNumberResponse {
    result: String,
}

impl EvmProxySource {
    pub fn new(http: Arc<HttpExecutor>, base_url: String, api_key: &str) -> Self {
        let url = format!("{base_url}?module=proxy&action=eth_blockNumber&apikey={api_key}");
        Self { http, url }
    }
}

fn parse_block_number(response: BlockNumberResponse) -> Result<u64, DecodeError> {
    decode_hex_quantity(&response.result).map_err(|source| {
        DecodeError::InvalidNumber {
            field: "result",
            value: response.result,
            source,
        }
    })
}

#[async_trait]
impl HeightSource for EvmProxySource {
    #[instrument(name = "evm_proxy::fetch_height", skip_all, fields(network = %network.symbol), level = "debug")]
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError> {
        self.http.get_json(&self.url, parse_block_number).await
    }

    fn name(&self) -> &'static str {
        "evm_proxy"
    }
}
