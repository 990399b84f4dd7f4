//! External option analytics service.
//!
//! The pipeline depends only on [`AnalyticsProvider`]; [`OpenAlgoClient`] is
//! the HTTP adapter for an OpenAlgo server.

mod openalgo;

pub use openalgo::OpenAlgoClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GreeksResponse, OptionChain};

/// Option chains and per-symbol Greeks from an analytics service.
#[async_trait]
pub trait AnalyticsProvider: Send + Sync {
    /// Chain for `symbol` on `exchange` at `expiry`, `strike_range` strikes
    /// either side of ATM.
    ///
    /// A chain the service answered with an error status is returned as
    /// `Ok` with [`OptionChain::reported_error`] set.
    async fn option_chain(
        &self,
        symbol: &str,
        exchange: &str,
        expiry: &str,
        strike_range: u32,
    ) -> Result<OptionChain>;

    /// Greeks, IV and prices for one option trading symbol.
    async fn option_greeks(&self, symbol: &str, exchange: &str) -> Result<GreeksResponse>;
}
