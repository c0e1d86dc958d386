//! Outbound request description.
//!
//! # Responsibilities
//! - Carry the target URL, extra headers and a per-request deadline
//! - Keep the transport-agnostic shape `HttpClient` implementations consume
//!
//! # Design Decisions
//! - Every request has a timeout; long polls simply carry a longer one
//! - Signing happens before the request is built, so the URL is final here

use std::time::Duration;

use url::Url;

/// A GET request to the configuration service.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            headers: Vec::new(),
            timeout,
        }
    }

    /// Attach headers, e.g. the output of `security::signer::build_headers`.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }
}
