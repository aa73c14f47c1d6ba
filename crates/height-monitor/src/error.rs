//! Error types for height fetching.

use crate::sources::SourceKind;
use std::{
    num::ParseIntError,
    sync::Arc,
};
use thiserror::Error;

/// Why a response body could not be turned into a height.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Body is not JSON or lacks the expected field.
    #[error("unexpected JSON shape: {0}")]
    Json(#[from] serde_json::Error),
    /// Field is present but is not a valid number in the expected base.
    #[error("invalid {field} value {value:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    /// Upstream answered with a well-formed body that reports no height.
    #[error("upstream reported: {0}")]
    Upstream(String),
}

/// Failure fetching one height from one source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, timeout or body read failure.
    #[error("request {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// Server answered with a non-success status.
    #[error("request {url} returned HTTP {status}, body: {body:?}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    /// Response arrived but could not be decoded.
    #[error("request {url} returned an undecodable body: {body:?}")]
    Decode {
        url: String,
        body: String,
        #[source]
        source: DecodeError,
    },
    /// Every attempt failed; wraps the last failure.
    #[error("giving up after {attempts} attempts")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
    /// No adapter is registered for the network on this source.
    #[error("no {source_kind} adapter registered for {network}")]
    NoSource {
        source_kind: SourceKind,
        network: String,
    },
    /// A batched response arrived but carried no height for the network.
    #[error("{url} reported no height for {network}")]
    Unreported { url: String, network: String },
    /// A request URL could not be built on top of the configured base.
    #[error("cannot build a request url from {url}")]
    InvalidEndpoint { url: String },
    /// A single upstream call serving several networks failed.
    #[error(transparent)]
    Shared(Arc<FetchError>),
    /// The worker task died before reporting.
    #[error("fetch worker failed: {0}")]
    Worker(String),
}

impl FetchError {
    /// The innermost non-retry failure.
    pub fn last_attempt(&self) -> &FetchError {
        match self {
            Self::RetryExhausted { source, .. } => source.last_attempt(),
            Self::Shared(source) => source.last_attempt(),
            other => other,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.last_attempt(), Self::Transport { .. } | Self::Status { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(
            self.last_attempt(),
            Self::Decode { .. } | Self::Unreported { .. }
        )
    }

    /// URL of the failing request, if one was made.
    pub fn url(&self) -> Option<&str> {
        match self.last_attempt() {
            Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::Decode { url, .. }
            | Self::Unreported { url, .. }
            | Self::InvalidEndpoint { url } => Some(url),
            _ => None,
        }
    }

    /// Raw response body of the failing request, if one was received.
    pub fn body(&self) -> Option<&str> {
        match self.last_attempt() {
            Self::Status { body, .. } | Self::Decode { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// An orchestration pass finished with at least one failed network.
///
/// Successful sibling readings are still returned alongside this error.
#[derive(Debug, Error)]
#[error("{failed} of {attempted} {source_kind} height fetches failed, first failure on {network}")]
pub struct PartialBatchError {
    pub source_kind: SourceKind,
    pub attempted: usize,
    pub failed: usize,
    /// Network of the first failure observed.
    pub network: String,
    #[source]
    pub first: FetchError,
}
