//! HTTP client abstraction.
//!
//! The core only needs `GET url + headers → (status, body)`; everything above
//! this trait is transport-agnostic so tests and embedders can swap it out.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;

/// Failure to obtain any HTTP response at all.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u128 },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Minimal HTTP GET contract consumed by the fetcher, notifier and locator.
///
/// Dropping the returned future must abort the request; that is how long polls
/// are cancelled.
#[async_trait]
pub trait HttpClient: Send + Sync + fmt::Debug {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed client used in production.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client with the given connect timeout. Read timeouts are per request.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest::Client` (custom TLS, proxies, pools).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        let mut builder = self.client.get(request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: url.clone(),
                    timeout_ms: request.timeout.as_millis(),
                }
            } else if e.is_connect() {
                TransportError::Connect {
                    url: url.clone(),
                    message: e.to_string(),
                }
            } else {
                TransportError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        };

        let response = builder.send().await.map_err(&map_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(&map_err)?;

        tracing::trace!(url = %url, status, "HTTP GET completed");
        Ok(HttpResponse { status, body })
    }
}
