//! Outbound HTTP for the NSE data source.
//!
//! [`FetchClient`] wraps [`reqwest::Client`] with a fixed connect timeout and
//! redirect following. Every call carries its own request timeout, taken from
//! the task. Handlers depend on the [`Fetch`] trait so tests can substitute a
//! canned source.
//!
//! A non-2xx status is *not* an error here: it comes back in
//! [`FetchResponse::status`] so the caller can format a descriptive result.
//! Nothing in this module retries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::constants::{CONNECT_TIMEOUT_MS, USER_AGENT};
use crate::error::{FeedError, Result};

/// Raw result of a GET: status code and body bytes.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl FetchResponse {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A source of raw HTTP responses.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Perform one GET with the given headers and request timeout.
    async fn get(&self, url: &str, headers: HeaderMap, timeout: Duration) -> Result<FetchResponse>;
}

/// HTTP client for the NSE endpoints.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use nse_feed::client::{Fetch, FetchClient};
/// use nse_feed::constants::{NSE_ALL_INDICES_URL, NSE_REFERER_INDICES};
///
/// # #[tokio::main]
/// # async fn main() -> nse_feed::Result<()> {
/// let client = FetchClient::new()?;
/// let resp = client
///     .get(
///         NSE_ALL_INDICES_URL,
///         FetchClient::nse_headers(NSE_REFERER_INDICES),
///         Duration::from_secs(30),
///     )
///     .await?;
/// println!("status={} bytes={}", resp.status, resp.body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
}

impl FetchClient {
    /// Create a client with the default connect timeout.
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(Duration::from_millis(CONNECT_TIMEOUT_MS))
    }

    /// Create a client with a custom connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { http })
    }

    /// Returns a reference to the underlying `reqwest::Client`.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The browser-like header set the NSE edge expects, with the given referer.
    pub fn nse_headers(referer: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::with_capacity(12);
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,hi;q=0.8"),
        );
        headers.insert(header::REFERER, HeaderValue::from_static(referer));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(
            "sec-ch-ua",
            HeaderValue::from_static(
                "\"Not(A:Brand\";v=\"8\", \"Chromium\";v=\"144\", \"Google Chrome\";v=\"144\"",
            ),
        );
        headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
        headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
        headers
    }
}

#[async_trait]
impl Fetch for FetchClient {
    async fn get(&self, url: &str, headers: HeaderMap, timeout: Duration) -> Result<FetchResponse> {
        tracing::debug!(%url, timeout_ms = timeout.as_millis() as u64, "GET");

        let resp = self
            .http
            .get(url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(FeedError::Fetch)?;
        tracing::info!(%url, status, body_len = body.len(), "HTTP response");

        Ok(FetchResponse { status, body })
    }
}
