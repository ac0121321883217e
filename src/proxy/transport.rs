//! Retrying proxy transport.
//!
//! One pooled `reqwest::Client` is built at startup and shared by every
//! reverse-proxied call. Transport failures are retried with exponential
//! backoff; any HTTP response, whatever its status, ends the loop.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use std::time::Duration;
use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::retries::{is_retryable, RetryPolicy};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("{url} unreachable after {attempts} attempt(s): {source}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A downstream response.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Shared, connection-pooled HTTP client with bounded retry.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryingTransport {
    pub fn new(policy: RetryPolicy, pool_max_idle_per_host: usize) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(policy.connect_timeout)
            .pool_max_idle_per_host(pool_max_idle_per_host)
            .no_proxy()
            .build()
            .map_err(TransportError::Build)?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The underlying pooled client, for one-shot calls that must not retry.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send with the policy's read timeout.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<ProxyResponse, TransportError> {
        self.send_with_timeout(method, url, headers, body, self.policy.read_timeout)
            .await
    }

    /// Send with an explicit read timeout.
    pub async fn send_with_timeout(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
        read_timeout: Duration,
    ) -> Result<ProxyResponse, TransportError> {
        let max_attempts = self.policy.max_attempts();
        let mut attempts = 0;

        loop {
            attempts += 1;

            let result = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone())
                .body(body.clone())
                .timeout(read_timeout)
                .send()
                .await;

            let error = match result {
                Ok(response) => {
                    let status = response.status();
                    let headers = response.headers().clone();
                    let body = response.bytes().await.map_err(|source| TransportError::Request {
                        url: url.to_string(),
                        source,
                    })?;
                    return Ok(ProxyResponse { status, headers, body });
                }
                Err(e) => e,
            };

            if attempts < max_attempts && is_retryable(&error) {
                let backoff = self.policy.backoff(attempts);
                tracing::info!(
                    url = %url,
                    attempt = attempts,
                    delay = ?backoff,
                    error = %error,
                    "Retrying proxied request"
                );
                metrics::record_proxy_retry(method.as_str());
                tokio::time::sleep(backoff).await;
                continue;
            }

            tracing::error!(url = %url, attempts, error = %error, "Proxied request failed");
            return Err(if is_retryable(&error) {
                TransportError::Exhausted {
                    url: url.to_string(),
                    attempts,
                    source: error,
                }
            } else {
                TransportError::Request {
                    url: url.to_string(),
                    source: error,
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::any, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base_secs: 0.01,
            connect_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_status_is_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/fail",
            any(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::SERVICE_UNAVAILABLE, "down")
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let transport = RetryingTransport::new(fast_policy(4), 4).unwrap();
        let response = transport
            .send(
                Method::POST,
                &format!("http://{}/fail", addr),
                HeaderMap::new(),
                Bytes::from_static(b"{}"),
            )
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&response.body[..], b"down");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_exhausts_retries() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = RetryingTransport::new(fast_policy(2), 4).unwrap();
        let err = transport
            .send(
                Method::GET,
                &format!("http://{}/", addr),
                HeaderMap::new(),
                Bytes::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Exhausted { attempts: 3, .. }));
    }
}
