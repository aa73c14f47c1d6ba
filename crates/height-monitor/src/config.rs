//! Resolved runtime configuration.
//!
//! Values come from command-line flags or environment variables first and
//! from an optional flat JSON file second. The file maps variable names to
//! scalar values:
//!
//! ```json
//! {
//!   "ENV": "staging",
//!   "MONITOR_WATCHTOWER_BASE_URL": "https://watchtower.internal/",
//!   "COINQUERY_URL": "https://coinquery.internal"
//! }
//! ```

use crate::{
    cli::Args,
    monitor::DEFAULT_CHECK_INTERVAL,
    orchestrator::DEFAULT_MAX_CONCURRENCY,
    retry::{
        DEFAULT_MAX_ATTEMPTS,
        DEFAULT_RETRY_DELAY,
        RetryPolicy,
    },
};
use serde_json::Value;
use std::{
    collections::HashMap,
    fs,
    net::{
        IpAddr,
        Ipv4Addr,
        SocketAddr,
    },
    path::{
        Path,
        PathBuf,
    },
    str::FromStr,
    time::Duration,
};
use tracing::warn;
use url::Url;

pub const DEFAULT_API_KEY: &str = "WT_MONITOR";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_METRICS_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9000);

/// Every variable the monitor reads, as flag, environment variable or file key.
pub const KNOWN_KEYS: &[&str] = &[
    "ENV",
    "ENVIRONMENT",
    "CONFIG_FILE_PATH",
    "MONITOR_WATCHTOWER_BASE_URL",
    "COINQUERY_URL",
    "COINQUERY_ETH_URL",
    "COINQUERY_API_KEY",
    "COSMOS_GAIACLI_URL",
    "THORCHAIN_GAIACLI_URL",
    "BINANCE_BNBNODE_URL",
    "FIO_REMOTE_URL",
    "RIPPLE_BLOCK_EXPLORER_URL",
    "HEIGHT_MONITOR_CHECK_INTERVAL_SECS",
    "HEIGHT_MONITOR_RETRY_ATTEMPTS",
    "HEIGHT_MONITOR_RETRY_DELAY_SECS",
    "HEIGHT_MONITOR_REQUEST_TIMEOUT_SECS",
    "HEIGHT_MONITOR_MAX_CONCURRENCY",
    "HEIGHT_MONITOR_DISABLED_NETWORKS",
    "HEIGHT_MONITOR_METRICS_ADDR",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    ReadError(String),
    #[error("{0}")]
    ParseError(String),
    #[error("config value {key} must be a string, number or boolean, got {value}")]
    UnsupportedValue { key: String, value: String },
    #[error("no {0} set")]
    Missing(&'static str),
    #[error("{key} is not a valid http(s) url: {value}")]
    InvalidUrl { key: &'static str, value: String },
    #[error("{key} has an invalid value: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Configuration loaded from a flat JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    values: HashMap<String, String>,
}

impl FileConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ConfigError::ReadError(format!("Failed to read {}: {e}", path.display()))
        })?;

        contents.parse().map_err(|e| match e {
            ConfigError::ParseError(msg) => {
                ConfigError::ParseError(format!("Failed to parse {}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Value for `key`, if present and not empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Keys the monitor does not read, sorted.
    pub fn unknown_keys(&self) -> Vec<&str> {
        let mut unknown: Vec<&str> = self
            .values
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_KEYS.contains(key))
            .collect();
        unknown.sort_unstable();
        unknown
    }
}

impl FromStr for FileConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: HashMap<String, Value> = serde_json::from_str(s)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse JSON: {e}")))?;

        let values = raw
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(ConfigError::UnsupportedValue {
                            key,
                            value: other.to_string(),
                        });
                    }
                };
                Ok((key, value))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { values })
    }
}

/// Base URLs of every upstream the monitor queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub watchtower_base_url: String,
    pub coinquery_url: String,
    pub coinquery_eth_url: String,
    pub cosmos_url: String,
    pub thorchain_url: String,
    pub binance_url: String,
    pub fio_url: String,
    pub ripple_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Tag attached to every divergence gauge
    pub environment: String,
    pub endpoints: Endpoints,
    pub api_key: String,
    pub check_interval: Duration,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_concurrency: usize,
    pub disabled_networks: Vec<String>,
    pub metrics_addr: SocketAddr,
}

impl Config {
    /// Merge parsed arguments with the config file they point at.
    ///
    /// The file is `--config-file-path` when given, otherwise
    /// `./config/<ENVIRONMENT>.json` when `ENVIRONMENT` is set, otherwise none.
    pub fn resolve(args: Args) -> Result<Self, ConfigError> {
        let file = match config_file_path(&args) {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        for key in file.unknown_keys() {
            warn!(key, "Ignoring unknown config file key");
        }
        Self::from_parts(args, &file)
    }

    /// Build a config from arguments, falling back to `file` for unset values.
    pub fn from_parts(args: Args, file: &FileConfig) -> Result<Self, ConfigError> {
        let lookup = |arg: Option<String>, key: &'static str| -> Option<String> {
            arg.filter(|value| !value.is_empty())
                .or_else(|| file.get(key).map(str::to_string))
        };
        let required = |arg: Option<String>, key: &'static str| {
            lookup(arg, key).ok_or(ConfigError::Missing(key))
        };
        let url = |arg: Option<String>, key: &'static str| {
            required(arg, key).and_then(|value| validate_url(key, value))
        };

        let endpoints = Endpoints {
            watchtower_base_url: url(args.watchtower_base_url, "MONITOR_WATCHTOWER_BASE_URL")?,
            coinquery_url: url(args.coinquery_url, "COINQUERY_URL")?,
            coinquery_eth_url: url(args.coinquery_eth_url, "COINQUERY_ETH_URL")?,
            cosmos_url: url(args.cosmos_url, "COSMOS_GAIACLI_URL")?,
            thorchain_url: url(args.thorchain_url, "THORCHAIN_GAIACLI_URL")?,
            binance_url: url(args.binance_url, "BINANCE_BNBNODE_URL")?,
            fio_url: url(args.fio_url, "FIO_REMOTE_URL")?,
            ripple_url: url(args.ripple_url, "RIPPLE_BLOCK_EXPLORER_URL")?,
        };

        let disabled_networks = if args.disabled_networks.is_empty() {
            file.get("HEIGHT_MONITOR_DISABLED_NETWORKS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|symbol| !symbol.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            args.disabled_networks
        };

        let check_interval_secs = positive(
            setting(args.check_interval_secs, file, "HEIGHT_MONITOR_CHECK_INTERVAL_SECS")?,
            "HEIGHT_MONITOR_CHECK_INTERVAL_SECS",
        )?;
        let request_timeout_secs = positive(
            setting(args.request_timeout_secs, file, "HEIGHT_MONITOR_REQUEST_TIMEOUT_SECS")?,
            "HEIGHT_MONITOR_REQUEST_TIMEOUT_SECS",
        )?;
        let max_concurrency = positive(
            setting(args.max_concurrency, file, "HEIGHT_MONITOR_MAX_CONCURRENCY")?,
            "HEIGHT_MONITOR_MAX_CONCURRENCY",
        )?;
        let retry_attempts = setting(args.retry_attempts, file, "HEIGHT_MONITOR_RETRY_ATTEMPTS")?;
        let retry_delay_secs =
            setting(args.retry_delay_secs, file, "HEIGHT_MONITOR_RETRY_DELAY_SECS")?;

        Ok(Self {
            environment: required(args.env, "ENV")?,
            endpoints,
            api_key: lookup(args.coinquery_api_key, "COINQUERY_API_KEY")
                .unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            check_interval: check_interval_secs
                .map_or(DEFAULT_CHECK_INTERVAL, Duration::from_secs),
            request_timeout: request_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
            retry: RetryPolicy::new(
                retry_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                retry_delay_secs.map_or(DEFAULT_RETRY_DELAY, Duration::from_secs),
            ),
            max_concurrency: max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            disabled_networks,
            metrics_addr: setting(args.metrics_addr, file, "HEIGHT_MONITOR_METRICS_ADDR")?
                .unwrap_or(DEFAULT_METRICS_ADDR),
        })
    }
}

/// `arg` when given, otherwise the file value for `key` parsed as `T`.
fn setting<T: FromStr>(
    arg: Option<T>,
    file: &FileConfig,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match arg {
        Some(value) => Ok(Some(value)),
        None => {
            file.get(key)
                .map(|raw| {
                    raw.trim().parse().map_err(|_| {
                        ConfigError::InvalidValue {
                            key,
                            value: raw.to_string(),
                        }
                    })
                })
                .transpose()
        }
    }
}

fn positive<T: Default + PartialEq + ToString>(
    value: Option<T>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match value {
        Some(zero) if zero == T::default() => {
            Err(ConfigError::InvalidValue {
                key,
                value: zero.to_string(),
            })
        }
        other => Ok(other),
    }
}

fn config_file_path(args: &Args) -> Option<PathBuf> {
    args.config_file_path.clone().or_else(|| {
        args.environment
            .as_deref()
            .filter(|environment| !environment.is_empty())
            .map(|environment| PathBuf::from(format!("./config/{environment}.json")))
    })
}

fn validate_url(key: &'static str, value: String) -> Result<String, ConfigError> {
    match Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(value),
        _ => Err(ConfigError::InvalidUrl { key, value }),
    }
}
