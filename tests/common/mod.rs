//! In-memory doubles shared by the integration tests.
//!
//! Each double records what the pipeline asked of it so tests can assert on
//! I/O as well as on result strings.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;

use nse_feed::analytics::AnalyticsProvider;
use nse_feed::client::{Fetch, FetchResponse};
use nse_feed::error::{FeedError, Result};
use nse_feed::notify::Notifier;
use nse_feed::persist::{ChainContext, ChainRun, ChainStore, PreviousOi};
use nse_feed::types::{Greeks, GreeksResponse, OptionChain, Side};

// =============================================================================
// Fetch
// =============================================================================

/// Answers GETs from a list of `(needle, status, body)` routes. The first
/// route whose needle occurs in the URL wins; anything else is a 404.
#[derive(Default)]
pub struct StubFetch {
    routes: Mutex<Vec<(String, u16, String)>>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl StubFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, needle: &str, status: u16, body: &str) -> Self {
        self.set_route(needle, status, body);
        self
    }

    /// Replace (or add) the route for `needle`.
    pub fn set_route(&self, needle: &str, status: u16, body: &str) {
        let mut routes = self.routes.lock().unwrap();
        routes.retain(|(n, _, _)| n != needle);
        routes.push((needle.to_owned(), status, body.to_owned()));
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.urls().iter().filter(|u| u.contains(needle)).count()
    }
}

#[async_trait]
impl Fetch for StubFetch {
    async fn get(&self, url: &str, _headers: HeaderMap, timeout: Duration) -> Result<FetchResponse> {
        self.calls.lock().unwrap().push((url.to_owned(), timeout));
        let routes = self.routes.lock().unwrap();
        let (status, body) = routes
            .iter()
            .find(|(needle, _, _)| url.contains(needle.as_str()))
            .map(|(_, s, b)| (*s, b.clone()))
            .unwrap_or((404, String::new()));
        Ok(FetchResponse {
            status,
            body: Bytes::from(body),
        })
    }
}

// =============================================================================
// Notifier
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub key: String,
    pub payload: String,
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<Published>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<Published> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()> {
        self.messages.lock().unwrap().push(Published {
            topic: topic.to_owned(),
            key: key.to_owned(),
            payload: payload.to_owned(),
        });
        Ok(())
    }
}

// =============================================================================
// Analytics
// =============================================================================

/// Returns a fixed chain and a delta derived from the strike for every leg.
/// Symbols listed in `failing` get a transport-style error instead.
#[derive(Default)]
pub struct StubAnalytics {
    chain: Mutex<OptionChain>,
    failing: Mutex<Vec<String>>,
    greeks_calls: Mutex<Vec<(String, String)>>,
}

impl StubAnalytics {
    pub fn with_chain(chain: OptionChain) -> Self {
        Self {
            chain: Mutex::new(chain),
            ..Self::default()
        }
    }

    pub fn set_chain(&self, chain: OptionChain) {
        *self.chain.lock().unwrap() = chain;
    }

    pub fn fail_for(&self, symbol: &str) {
        self.failing.lock().unwrap().push(symbol.to_owned());
    }

    /// `(symbol, exchange)` of every greeks call, in order.
    pub fn greeks_calls(&self) -> Vec<(String, String)> {
        self.greeks_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsProvider for StubAnalytics {
    async fn option_chain(
        &self,
        _symbol: &str,
        _exchange: &str,
        _expiry: &str,
        _strike_range: u32,
    ) -> Result<OptionChain> {
        Ok(self.chain.lock().unwrap().clone())
    }

    async fn option_greeks(&self, symbol: &str, exchange: &str) -> Result<GreeksResponse> {
        self.greeks_calls
            .lock()
            .unwrap()
            .push((symbol.to_owned(), exchange.to_owned()));
        if self.failing.lock().unwrap().iter().any(|s| s == symbol) {
            return Err(FeedError::Enrichment(format!("no quote for {symbol}")));
        }
        let delta = if symbol.ends_with("CE") { 0.5 } else { -0.5 };
        Ok(GreeksResponse {
            status: Some("success".into()),
            symbol: Some(symbol.to_owned()),
            spot_price: Some(21500.0),
            implied_volatility: Some(12.5),
            greeks: Some(Greeks {
                delta: Some(delta),
                gamma: Some(0.001),
                theta: Some(-4.2),
                vega: Some(11.0),
            }),
            ..GreeksResponse::default()
        })
    }
}

// =============================================================================
// Chain store
// =============================================================================

/// Keeps every inserted run; `latest_oi` reads the most recent value per
/// symbol, later runs overriding earlier ones.
#[derive(Default)]
pub struct MemoryChainStore {
    runs: Mutex<Vec<ChainRun>>,
}

impl MemoryChainStore {
    pub fn runs(&self) -> Vec<ChainRun> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainStore for MemoryChainStore {
    async fn latest_oi(&self, context: &ChainContext, side: Side) -> Result<PreviousOi> {
        let mut latest = HashMap::new();
        for run in self.runs.lock().unwrap().iter().filter(|r| &r.context == context) {
            for entry in &run.entries {
                let leg = match side {
                    Side::Call => entry.ce.as_ref(),
                    Side::Put => entry.pe.as_ref(),
                };
                if let Some((symbol, leg)) = leg.and_then(|l| l.trading_symbol().map(|s| (s, l))) {
                    latest.insert(symbol.to_owned(), leg.oi);
                }
            }
        }
        Ok(latest)
    }

    async fn insert_run(&self, run: &ChainRun) -> Result<()> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }
}
