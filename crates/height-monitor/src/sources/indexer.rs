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
use std::{
    collections::HashMap,
    sync::Arc,
};
use tracing::instrument;

/// The indexing service's `GET /metrics/latest_block` endpoint, which reports
/// the last processed block of every network it ingests.
///
/// One response covers every network, so the source is batched: a pass makes
/// a single (retried) request and splits it per network.
///
/// The indexer answers with HTTP 400 and `"success": false` while any of its
/// ingesters is still starting.
#[derive(Debug)]
pub struct IndexerSource {
    http: Arc<HttpExecutor>,
    url: String,
}

#[derive(Debug, Deserialize)]
struct LatestBlocks {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<HashMap<String, u64>>,
    #[serde(default)]
    error: Option<String>,
}

impl IndexerSource {
    pub fn new(http: Arc<HttpExecutor>, base_url: String) -> Self {
        let url = format!("{}/metrics/latest_block", base_url.trim_end_matches('/'));
        Self { http, url }
    }

    async fn latest_blocks(&self) -> Result<HashMap<String, u64>, FetchError> {
        self.http.get_json(&self.url, reported_heights).await
    }

    fn height_for(
        &self,
        heights: &HashMap<String, u64>,
        network: &Network,
    ) -> Result<u64, FetchError> {
        heights.get(network.symbol).copied().ok_or_else(|| {
            FetchError::Unreported {
                url: self.url.clone(),
                network: network.symbol.to_string(),
            }
        })
    }
}

fn reported_heights(latest: LatestBlocks) -> Result<HashMap<String, u64>, DecodeError> {
    if latest.success == Some(false) {
        return Err(DecodeError::Upstream(
            latest
                .error
                .unwrap_or_else(|| "indexer reported failure".to_string()),
        ));
    }

    Ok(latest.data.unwrap_or_default())
}

#[async_trait]
impl HeightSource for IndexerSource {
    #[instrument(name = "indexer::fetch_height", skip_all, fields(network = %network.symbol), level = "debug")]
    async fn fetch_height(&self, network: &Network) -> Result<u64, FetchError> {
        let heights = self.latest_blocks().await?;
        self.height_for(&heights, network)
    }

    fn name(&self) -> &'static str {
        "indexer"
    }

    fn batched(&self) -> bool {
        true
    }

    #[instrument(name = "indexer::fetch_heights", skip_all, fields(networks = networks.len()), level = "debug")]
    async fn fetch_heights(&self, networks: &[Network]) -> Vec<Result<u64, FetchError>> {
        match self.latest_blocks().await {
            Ok(heights) => {
                networks
                    .iter()
                    .map(|network| self.height_for(&heights, network))
                    .collect()
            }
            Err(err) => {
                let err = Arc::new(err);
                networks
                    .iter()
                    .map(|_| Err(FetchError::Shared(err.clone())))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        network::ChainFamily,
        retry::RetryPolicy,
    };
    use assert_matches::assert_matches;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn source_with_attempts(server: &MockServer, attempts: u32) -> IndexerSource {
        let http = Arc::new(
            HttpExecutor::new(
                Duration::from_secs(5),
                RetryPolicy::new(attempts, Duration::ZERO),
            )
            .unwrap(),
        );
        IndexerSource::new(http, server.url("/"))
    }

    fn source(server: &MockServer) -> IndexerSource {
        source_with_attempts(server, 1)
    }

    #[tokio::test]
    async fn picks_network_from_latest_blocks() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/metrics/latest_block");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "data": { "BTC": 650_120, "ETH": 10_923_000, "ATOM": 3_285_410 }
            }));
        });

        let source = source(&server);
        let btc = source
            .fetch_height(&Network::new("BTC", ChainFamily::Utxo))
            .await
            .unwrap();
        let atom = source
            .fetch_height(&Network::new("ATOM", ChainFamily::CosmosSdk))
            .await
            .unwrap();

        assert_eq!(btc, 650_120);
        assert_eq!(atom, 3_285_410);
        mock.assert_hits(2);
    }

    #[tokio::test]
    async fn unreported_network_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/metrics/latest_block");
            then.status(200)
                .json_body(serde_json::json!({ "success": true, "data": { "BTC": 1 } }));
        });

        let error = source_with_attempts(&server, 3)
            .fetch_height(&Network::new("XRP", ChainFamily::Ripple))
            .await
            .unwrap_err();

        assert_matches!(error, FetchError::Unreported { network, .. } if network == "XRP");
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn batch_makes_one_request_for_every_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/metrics/latest_block");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "data": { "BTC": 650_120, "ETH": 10_923_000 }
            }));
        });
        let networks = [
            Network::new("BTC", ChainFamily::Utxo),
            Network::new("XRP", ChainFamily::Ripple),
            Network::new("ETH", ChainFamily::Evm),
        ];

        let source = source_with_attempts(&server, 3);
        assert!(source.batched());
        let heights = source.fetch_heights(&networks).await;

        assert_eq!(heights.len(), 3);
        assert_eq!(heights[0].as_ref().unwrap(), &650_120);
        assert_matches!(&heights[1], Err(FetchError::Unreported { network, .. }) if network == "XRP");
        assert_eq!(heights[2].as_ref().unwrap(), &10_923_000);
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn failed_batch_is_shared_by_every_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/metrics/latest_block");
            then.status(200).json_body(serde_json::json!({
                "success": false,
                "error": "Ingestors are still starting"
            }));
        });
        let networks = [
            Network::new("BTC", ChainFamily::Utxo),
            Network::new("ETH", ChainFamily::Evm),
        ];

        let heights = source_with_attempts(&server, 3)
            .fetch_heights(&networks)
            .await;

        assert_eq!(heights.len(), 2);
        for height in &heights {
            let error = height.as_ref().unwrap_err();
            assert_matches!(error, FetchError::Shared(_));
            assert_matches!(
                error.last_attempt(),
                FetchError::Decode { source: DecodeError::Upstream(msg), .. }
                    if msg == "Ingestors are still starting"
            );
        }
        // One retried request for the whole batch, not one per network.
        mock.assert_hits(3);
    }

    #[tokio::test]
    async fn starting_ingesters_surface_as_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/metrics/latest_block");
            then.status(400).json_body(serde_json::json!({
                "success": false,
                "error": "Ingestors are still starting"
            }));
        });

        let error = source(&server)
            .fetch_height(&Network::new("BTC", ChainFamily::Utxo))
            .await
            .unwrap_err();

        assert_matches!(error.last_attempt(), FetchError::Status { status: 400, .. });
        assert!(error.body().unwrap().contains("Ingestors are still starting"));
    }

    #[test]
    fn unsuccessful_body_reports_upstream_error() {
        let latest = LatestBlocks {
            success: Some(false),
            data: None,
            error: Some("Ingestors are still starting".to_string()),
        };

        assert_matches!(
            reported_heights(latest),
            Err(DecodeError::Upstream(msg)) if msg == "Ingestors are still starting"
        );
    }
}
