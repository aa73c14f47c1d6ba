//! Command-line configuration for the height monitor.
//!
//! Every value can also come from the environment, or from a flat JSON config
//! file keyed by the same variable names, see [`crate::config`]. Defaults are
//! applied after the file has been consulted.

use clap::Parser;
use std::{
    net::SocketAddr,
    path::PathBuf,
};

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Environment tag attached to every divergence gauge
    #[arg(long = "env", env = "ENV")]
    pub env: Option<String>,

    /// Selects `./config/<ENVIRONMENT>.json` when no config file path is given
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Flat JSON file supplying any of the variables below
    #[arg(long, env = "CONFIG_FILE_PATH")]
    pub config_file_path: Option<PathBuf>,

    /// Base URL of the indexing service
    #[arg(long, env = "MONITOR_WATCHTOWER_BASE_URL")]
    pub watchtower_base_url: Option<String>,

    /// Node proxy base URL for the UTXO networks
    #[arg(long, env = "COINQUERY_URL")]
    pub coinquery_url: Option<String>,

    /// Node proxy URL for ETH
    #[arg(long, env = "COINQUERY_ETH_URL")]
    pub coinquery_eth_url: Option<String>,

    /// API key appended to node proxy requests
    #[arg(long, env = "COINQUERY_API_KEY")]
    pub coinquery_api_key: Option<String>,

    #[arg(long, env = "COSMOS_GAIACLI_URL")]
    pub cosmos_url: Option<String>,

    #[arg(long, env = "THORCHAIN_GAIACLI_URL")]
    pub thorchain_url: Option<String>,

    #[arg(long, env = "BINANCE_BNBNODE_URL")]
    pub binance_url: Option<String>,

    #[arg(long, env = "FIO_REMOTE_URL")]
    pub fio_url: Option<String>,

    #[arg(long, env = "RIPPLE_BLOCK_EXPLORER_URL")]
    pub ripple_url: Option<String>,

    /// Seconds between passes [default: 30]
    #[arg(long, env = "HEIGHT_MONITOR_CHECK_INTERVAL_SECS")]
    pub check_interval_secs: Option<u64>,

    /// Attempts per HTTP step, including the first one [default: 3]
    #[arg(long, env = "HEIGHT_MONITOR_RETRY_ATTEMPTS")]
    pub retry_attempts: Option<u32>,

    /// Seconds between attempts [default: 2]
    #[arg(long, env = "HEIGHT_MONITOR_RETRY_DELAY_SECS")]
    pub retry_delay_secs: Option<u64>,

    /// Per-request timeout in seconds [default: 10]
    #[arg(long, env = "HEIGHT_MONITOR_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Upper bound on in-flight fetches per source [default: 32]
    #[arg(long, env = "HEIGHT_MONITOR_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Comma separated symbols to skip, e.g. `FIO,XRP`
    #[arg(long, env = "HEIGHT_MONITOR_DISABLED_NETWORKS", value_delimiter = ',')]
    pub disabled_networks: Vec<String>,

    /// Address of the Prometheus scrape endpoint [default: 0.0.0.0:9000]
    #[arg(long, env = "HEIGHT_MONITOR_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}
