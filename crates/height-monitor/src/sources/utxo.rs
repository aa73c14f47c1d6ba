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
use url::Url;
use tracing::{
    debug,
    instrument,
};

/// Insight-style explorer that only exposes heights through block records.
///
/// Resolves the latest block hash first, then looks the block up by hash.
/// Each request runs under its own retry budget.
#[derive(Debug)]
pub struct UtxoExplorerSource {
    http: Arc<HttpExecutor>,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct LastBlockHash {
    lastblockhash: String,
}

#[derive(Debug, Deserialize)]
struct BlockRecord {
    height: u64,
}

impl UtxoExplorerSource {
    pub fn new(http: Arc<HttpExecutor>, base_url: String, api_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// `{base}/{symbol}/{segments..}?{query..}&apikey=..`, each segment
    /// percent-encoded.
    fn endpoint(
        &self,
        network: &Network,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let invalid = || {
            FetchError::InvalidEndpoint {
                url: self.base_url.clone(),
            }
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push(&network.symbol.to_lowercase())
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("apikey", &self.api_key);
        }
        Ok(url.into())
    }

    fn last_block_hash_url(&self, network: &Network) -> Result<String, FetchError> {
        self.endpoint(network, &["status"], &[("q", "getLastBlockHash")])
    }

    fn block_url(&self, network: &Network, hash: &str) -> Result<String, FetchError> {
        self.endpoint(network, &["block", hash], &[])
    }
}

#[async_trait]
impl HeightSource for UtxoExplorerSource {
    #[instrument(name = "utxo_explorer::fetch_height", skip_all, fields(network = %network.symbol), level = "debug")]
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError> {
        let hash = self
            .http
            .get_json(&self.last_block_hash_url(network)?, |latest: LastBlockHash| {
                Ok(latest.lastblockhash)
            })
            .await?;
        debug!(hash = %hash, "Resolved latest block hash");

        self.http
            .get_json(&self.block_url(network, &hash)?, |block: BlockRecord| {
                Ok(block.height)
            })
            .await
    }

    fn name(&self) -> &'static str {
        "utxo_explorer"
    }
}
