use crate::{
    error::{
        DecodeError,
        FetchError,
    },
    retry::RetryPolicy,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{
    trace,
    warn,
};

/// Shared HTTP GET executor used by every adapter.
///
/// Each call is one retried step: send the request, read the body, decode it
/// and extract a value. Transport and decode failures both consume an attempt.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    retry: RetryPolicy,
}

impl HttpExecutor {
    /// Build an executor whose requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(client, retry))
    }

    pub fn with_client(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// GET `url`, decode the body as `R` and map it through `extract`, retrying
    /// the whole step according to the retry policy.
    pub async fn get_json<R, O, F>(&self, url: &str, extract: F) -> Result<O, FetchError>
    where
        R: DeserializeOwned,
        F: Fn(R) -> Result<O, DecodeError>,
    {
        let extract = &extract;
        self.retry
            .execute(move || self.get_once(url, extract))
            .await
            .map_err(|last| {
                warn!(
                    url = %url,
                    attempts = self.retry.attempts(),
                    error = %last,
                    body = ?last.body(),
                    "Request failed on every attempt"
                );
                FetchError::RetryExhausted {
                    attempts: self.retry.attempts(),
                    source: Box::new(last),
                }
            })
    }

    async fn get_once<R, O, F>(&self, url: &str, extract: &F) -> Result<O, FetchError>
    where
        R: DeserializeOwned,
        F: Fn(R) -> Result<O, DecodeError>,
    {
        let transport = |source| {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        trace!(url = %url, status = %status, body = %body, "Received response");

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let decoded = serde_json::from_str::<R>(&body)
            .map_err(DecodeError::from)
            .and_then(extract);

        decoded.map_err(|source| {
            FetchError::Decode {
                url: url.to_string(),
                body,
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use httpmock::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Height {
        height: u64,
    }

    fn executor(attempts: u32) -> HttpExecutor {
        HttpExecutor::new(
            Duration::from_secs(5),
            RetryPolicy::new(attempts, Duration::from_millis(1)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn decodes_and_extracts() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/height");
            then.status(200).json_body(serde_json::json!({ "height": 77 }));
        });

        let height = executor(3)
            .get_json(&server.url("/height"), |h: Height| Ok(h.height))
            .await
            .unwrap();

        assert_eq!(height, 77);
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn malformed_body_is_retried_then_reported_as_decode_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/height");
            then.status(200).body("<html>bad gateway</html>");
        });

        let error = executor(3)
            .get_json(&server.url("/height"), |h: Height| Ok(h.height))
            .await
            .unwrap_err();

        mock.assert_hits(3);
        assert_matches!(error, FetchError::RetryExhausted { attempts: 3, .. });
        assert!(error.is_decode());
        assert_eq!(error.body(), Some("<html>bad gateway</html>"));
        assert_eq!(error.url(), Some(server.url("/height").as_str()));
    }

    #[tokio::test]
    async fn non_success_status_is_a_status_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/height");
            then.status(503).body("unavailable");
        });

        let error = executor(2)
            .get_json(&server.url("/height"), |h: Height| Ok(h.height))
            .await
            .unwrap_err();

        mock.assert_hits(2);
        assert_matches!(
            error.last_attempt(),
            FetchError::Status { status: 503, body, .. } if body == "unavailable"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let error = executor(2)
            .get_json(&format!("http://127.0.0.1:{port}/height"), |h: Height| {
                Ok(h.height)
            })
            .await
            .unwrap_err();

        assert!(error.is_transport());
        assert_matches!(error.last_attempt(), FetchError::Transport { .. });
    }

    #[tokio::test]
    async fn extractor_failures_are_decode_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/height");
            then.status(200).json_body(serde_json::json!({ "height": 1 }));
        });

        let error = executor(1)
            .get_json(&server.url("/height"), |_: Height| -> Result<u64, _> {
                Err(DecodeError::Upstream("not ready".to_string()))
            })
            .await
            .unwrap_err();

        assert_matches!(
            error.last_attempt(),
            FetchError::Decode { source: DecodeError::Upstream(msg), .. } if msg == "not ready"
        );
    }

    #[tokio::test]
    async fn slow_upstream_hits_request_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/height");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(serde_json::json!({ "height": 1 }));
        });

        let executor = HttpExecutor::new(
            Duration::from_millis(100),
            RetryPolicy::new(1, Duration::ZERO),
        )
        .unwrap();
        let error = executor
            .get_json(&server.url("/height"), |h: Height| Ok(h.height))
            .await
            .unwrap_err();

        assert!(error.is_transport());
    }
}
