#![allow(dead_code)]

use height_monitor::Endpoints;
use httpmock::{
    Mock,
    prelude::*,
};
use metrics_util::{
    MetricKind,
    debugging::{
        DebugValue,
        Snapshotter,
    },
};
use serde_json::json;
use std::{
    collections::BTreeMap,
    net::TcpListener,
};

pub const API_KEY: &str = "TEST_KEY";
pub const BTC_TIP: &str = "00000000000000000002d3c5d7a0e6f9";

pub fn try_start_mock_server() -> MockServer {
    TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("Failed to bind localhost for httpmock: {err}"))
        .and_then(|listener| {
            drop(listener);
            std::panic::catch_unwind(MockServer::start).map_err(|err| {
                if let Some(msg) = err.downcast_ref::<&str>() {
                    (*msg).to_string()
                } else if let Some(msg) = err.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "MockServer::start() panicked".to_string()
                }
            })
        })
        .expect("Failed to start httpmock server")
}

/// Every upstream served from one mock server under its own path prefix.
pub fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints {
        watchtower_base_url: server.url("/wt/"),
        coinquery_url: server.url("/cq"),
        coinquery_eth_url: server.url("/eth/api"),
        cosmos_url: server.url("/gaia"),
        thorchain_url: server.url("/thor"),
        binance_url: server.url("/bnb"),
        fio_url: server.url("/fio"),
        ripple_url: server.url("/xrp"),
    }
}

/// Node proxy heights: RUNE 1000, ATOM 500, BTC 650001, ETH 10922712,
/// FIO 100, XRP 57000000, BNB 120000000.
pub fn mock_node_proxies(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/thor/blocks/latest");
        then.status(200)
            .json_body(json!({ "block": { "header": { "height": "1000" } } }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/gaia/blocks/latest");
        then.status(200)
            .json_body(json!({ "block": { "header": { "height": "500" } } }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/cq/btc/status")
            .query_param("q", "getLastBlockHash")
            .query_param("apikey", API_KEY);
        then.status(200).json_body(json!({ "lastblockhash": BTC_TIP }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/cq/btc/block/{BTC_TIP}"))
            .query_param("apikey", API_KEY);
        then.status(200)
            .json_body(json!({ "hash": BTC_TIP, "height": 650_001 }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/eth/api")
            .query_param("module", "proxy")
            .query_param("action", "eth_blockNumber")
            .query_param("apikey", API_KEY);
        then.status(200)
            .json_body(json!({ "jsonrpc": "2.0", "id": 83, "result": "0xa6aad8" }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/fio/v1/chain/get_info");
        then.status(200).json_body(json!({
            "head_block_num": 101,
            "fork_db_head_block_num": 100
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/xrp/v2/ledgers");
        then.status(200)
            .json_body(json!({ "result": "success", "ledger": { "ledger_index": 57_000_000 } }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/bnb/status");
        then.status(200).json_body(json!({
            "result": { "sync_info": { "latest_block_height": "120000000" } }
        }));
    });
}

/// Indexer reporting `heights`, served at `/wt/metrics/latest_block`.
pub fn mock_indexer<'a>(server: &'a MockServer, heights: serde_json::Value) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(GET).path("/wt/metrics/latest_block");
        then.status(200)
            .json_body(json!({ "success": true, "data": heights }));
    })
}

/// Divergence gauges keyed by network, with their `environment` label.
pub fn divergence_gauges(snapshotter: &Snapshotter) -> BTreeMap<String, (String, f64)> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Gauge
                && !key.key().name().starts_with("height_monitor_")
        })
        .map(|(key, _, _, value)| {
            let environment = key
                .key()
                .labels()
                .find(|label| label.key() == "environment")
                .map(|label| label.value().to_string())
                .unwrap_or_default();
            let DebugValue::Gauge(value) = value else {
                panic!("expected gauge value");
            };
            (
                key.key().name().to_string(),
                (environment, value.into_inner()),
            )
        })
        .collect()
}
