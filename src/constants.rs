//! Constants for the NSE data source, the cache-store key layout and the
//! notification bus.
//!
//! These are used internally by the handlers but are also exported so that
//! downstream consumers can read the same keys.

// ---------------------------------------------------------------------------
// NSE endpoints
// ---------------------------------------------------------------------------

/// All-indices snapshot (CSV).
pub const NSE_ALL_INDICES_URL: &str = "https://www.nseindia.com/api/allIndices?csv=true";

/// Equity gainers/losers variations (CSV).
pub const NSE_EQUITY_DATA_URL: &str =
    "https://www.nseindia.com/api/live-analysis-variations?index=gainers&type=allSec&csv=true";

/// Option chain for one (symbol, expiry). Query: `type`, `symbol`, `expiry`.
pub const NSE_OPTION_CHAIN_URL: &str = "https://www.nseindia.com/api/option-chain-v3";

/// Contract info (expiry list) for one symbol. Query: `symbol`.
pub const NSE_CONTRACT_INFO_URL: &str = "https://www.nseindia.com/api/option-chain-contract-info";

/// Referer sent with index and equity requests.
pub const NSE_REFERER_INDICES: &str = "https://www.nseindia.com/market-data/live-market-indices";

/// Referer sent with option-chain and contract-info requests.
pub const NSE_REFERER_OPTIONS: &str = "https://www.nseindia.com/option-chain";

/// Browser user agent the NSE edge expects.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Timeouts and defaults
// ---------------------------------------------------------------------------

/// Connect timeout, fixed for every outbound request.
pub const CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Per-request timeout when the task does not carry `timeoutMs`.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Equity variations are a much larger payload.
pub const DEFAULT_EQUITY_TIMEOUT_MS: u64 = 600_000;

/// Pause between analytics calls when the task does not carry `apiCallPauseMs`.
pub const DEFAULT_API_CALL_PAUSE_MS: u64 = 500;

/// Option-chain symbol when the task does not name one.
pub const DEFAULT_SYMBOL: &str = "NIFTY";

/// Exchange hint used for NSE index option chains.
pub const DEFAULT_EXCHANGE: &str = "NSE_INDEX";

// ---------------------------------------------------------------------------
// Cache-store keys
// ---------------------------------------------------------------------------

/// Cache-store key layout.
pub mod keys {
    /// Base key for the all-indices snapshot.
    pub const ALL_INDICES: &str = "nse:allindices";

    /// Base key for the equity variations snapshot.
    pub const EQUITY_DATA: &str = "nse:equitydata";

    /// Base key for one NSE option-chain snapshot.
    pub fn option_chain(symbol: &str, expiry: &str) -> String {
        format!("nse:optionchain:{symbol}:{expiry}")
    }

    /// Cached contract-info JSON for a symbol.
    pub fn expiries_data(symbol: &str) -> String {
        format!("nse:optionchain:{symbol}:expiries:data")
    }

    /// Fetch instant of the cached contract-info JSON.
    pub fn expiries_timestamp(symbol: &str) -> String {
        format!("nse:optionchain:{symbol}:expiries:timestamp")
    }

    /// Base key for an analytics-service option chain.
    pub fn analytics_chain(server: &str, symbol: &str, expiry: &str) -> String {
        format!("openalgo:{server}:{symbol}:{expiry}:optionchain")
    }

    /// Base key for the OI summary that accompanies a persisted chain.
    pub fn summary(chain_base: &str) -> String {
        format!("{chain_base}:summary")
    }
}

// ---------------------------------------------------------------------------
// Notification bus
// ---------------------------------------------------------------------------

/// Topic shared by every task kind.
pub const NOTIFY_TOPIC: &str = "nse.data";
