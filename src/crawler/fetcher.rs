//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with browser-like headers and timeouts
//! - GET requests for listing and profile pages
//! - Error classification
//!
//! The fetcher has no concurrency policy of its own; callers gate it with the
//! [`ConcurrencyLimiter`](crate::crawler::ConcurrencyLimiter).

use crate::config::HttpConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why a fetch produced no page content
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// Connection refused, DNS failure, TLS failure
    #[error("connection failed: {0}")]
    Connection(String),

    /// HTTP 404; the page simply has no data
    #[error("not found")]
    NotFound,

    /// Any other non-success status
    #[error("HTTP {0}")]
    HttpStatus(u16),

    /// The response body could not be read
    #[error("failed to read body: {0}")]
    Body(String),

    /// Redirect loop or a request that could not be built or sent as asked
    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Returns true for the expected "no data" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns true if the site could not be reached at all
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connection(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else if e.is_redirect() || e.is_request() || e.is_builder() {
            Self::Request(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client announces itself as an ordinary browser and applies the
/// configured total and connect timeouts to every request.
///
/// # Example
///
/// ```no_run
/// use jobseeker_harvest::config::HttpConfig;
/// use jobseeker_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body
///
/// # Error Mapping
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 2xx | `Ok(body)` |
/// | HTTP 404 | `FetchError::NotFound` |
/// | Other HTTP status | `FetchError::HttpStatus(code)` |
/// | Timeout | `FetchError::Timeout` |
/// | Connection refused / DNS / TLS | `FetchError::Connection` |
/// | Body read failure | `FetchError::Body` |
/// | Too many redirects / malformed request | `FetchError::Request` |
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound);
    }
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    response.text().await.map_err(FetchError::from_reqwest)
}
