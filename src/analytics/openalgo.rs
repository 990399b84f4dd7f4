//! OpenAlgo REST adapter.
//!
//! Both endpoints are `POST` with the API key in the JSON body:
//!
//! - `/api/v1/optionchain` — `{apikey, underlying, exchange, expiry_date, strike_count}`
//! - `/api/v1/optiongreeks` — `{apikey, symbol, exchange}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::analytics::AnalyticsProvider;
use crate::constants::{CONNECT_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS};
use crate::error::{FeedError, Result};
use crate::types::{GreeksResponse, OptionChain};

#[derive(Serialize)]
struct OptionChainRequest<'a> {
    apikey: &'a str,
    underlying: &'a str,
    exchange: &'a str,
    expiry_date: &'a str,
    strike_count: u32,
}

#[derive(Serialize)]
struct OptionGreeksRequest<'a> {
    apikey: &'a str,
    symbol: &'a str,
    exchange: &'a str,
}

/// HTTP client for one OpenAlgo server.
#[derive(Clone)]
pub struct OpenAlgoClient {
    http: reqwest::Client,
    host: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAlgoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAlgoClient")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl OpenAlgoClient {
    /// `host` is the server root, e.g. `http://127.0.0.1:5000`.
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(CONNECT_TIMEOUT_MS))
            .timeout(Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS))
            .default_headers(Self::default_headers())
            .build()?;
        Ok(Self {
            http,
            host: host.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// POST `body` to `path`. Error bodies are decoded too when they parse,
    /// since the service reports failures as `{"status":"error","message":..}`.
    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}{}", self.host, path);
        tracing::debug!(%url, "POST");

        let resp = self.http.post(&url).json(body).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<R>(&bytes) {
            Ok(decoded) => Ok(decoded),
            Err(_) if !status.is_success() => Err(FeedError::NonSuccessStatus {
                status: status.as_u16(),
                url,
            }),
            Err(err) => Err(FeedError::Decode(err)),
        }
    }
}

#[async_trait]
impl AnalyticsProvider for OpenAlgoClient {
    async fn option_chain(
        &self,
        symbol: &str,
        exchange: &str,
        expiry: &str,
        strike_range: u32,
    ) -> Result<OptionChain> {
        let req = OptionChainRequest {
            apikey: &self.api_key,
            underlying: symbol,
            exchange,
            expiry_date: expiry,
            strike_count: strike_range,
        };
        let chain: OptionChain = self.post("/api/v1/optionchain", &req).await?;
        tracing::info!(
            symbol,
            exchange,
            expiry,
            status = chain.status.as_deref().unwrap_or("unknown"),
            strikes = chain.chain.len(),
            "option chain received"
        );
        Ok(chain)
    }

    async fn option_greeks(&self, symbol: &str, exchange: &str) -> Result<GreeksResponse> {
        let req = OptionGreeksRequest {
            apikey: &self.api_key,
            symbol,
            exchange,
        };
        self.post("/api/v1/optiongreeks", &req).await
    }
}
