//! Task input and task-kind routing.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_API_CALL_PAUSE_MS, DEFAULT_EXCHANGE, DEFAULT_SYMBOL};
use crate::error::{FeedError, Result};

/// One invocation's parameters, as supplied by the outer scheduler.
///
/// Deserializes from camelCase JSON. The legacy scheduler field names
/// (`taskType`, `numberOfExpiry`, `taskTimeout`, `taskretries`, `taskdelay`)
/// are accepted as aliases.
///
/// `retries` and `delay_ms` are advisory to the caller's retry layer: the
/// pipeline performs exactly one attempt per call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Data kind to acquire; normalized before routing.
    #[serde(default, alias = "taskType")]
    pub kind: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub target_path: Option<String>,
    /// Underlying symbol for option-chain kinds.
    #[serde(default)]
    pub symbol: Option<String>,
    /// How many expiries to walk (default 1, minimum 1).
    #[serde(default, alias = "numberOfExpiry")]
    pub expiry_count: Option<i64>,
    /// Per-request timeout for calls to the data source.
    #[serde(default, alias = "taskTimeout")]
    pub timeout_ms: Option<u64>,
    #[serde(default, alias = "taskretries")]
    pub retries: Option<u32>,
    /// Pause between expiries; also the caller's delay-before-retry.
    #[serde(default, alias = "taskdelay")]
    pub delay_ms: Option<u64>,
    /// Pause after every analytics call.
    #[serde(default)]
    pub api_call_pause_ms: Option<u64>,
    #[serde(default)]
    pub exchange: Option<String>,
    /// Single expiry for the analytics chain kind.
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub strike_range: Option<i64>,
    #[serde(default)]
    pub server_name: Option<String>,
}

/// Advisory retry configuration the outer layer applies around a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Budget for one attempt.
    pub timeout: Duration,
    /// Extra attempts after the first.
    pub retries: u32,
    /// Fixed wait between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Task {
    /// Shorthand for a task with only `kind` set.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Resolve the routed kind.
    ///
    /// Fails with [`FeedError::InvalidTask`] when `kind` is missing or blank
    /// and with [`FeedError::UnknownTaskKind`] when nothing matches.
    pub fn task_kind(&self) -> Result<TaskKind> {
        match self.kind.as_deref() {
            None => Err(FeedError::InvalidTask("kind is required".into())),
            Some(raw) => raw.parse(),
        }
    }

    /// Request timeout, falling back to `default_ms`.
    pub fn request_timeout(&self, default_ms: u64) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(default_ms))
    }

    /// Option-chain symbol, defaulting to NIFTY.
    pub fn symbol_or_default(&self) -> &str {
        match self.symbol.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => DEFAULT_SYMBOL,
        }
    }

    /// Expiries to process, never less than one.
    pub fn expiry_count(&self) -> usize {
        match self.expiry_count {
            Some(n) if n > 0 => n as usize,
            _ => 1,
        }
    }

    /// Exchange hint, defaulting to the NSE index segment.
    pub fn exchange_or_default(&self) -> &str {
        match self.exchange.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => DEFAULT_EXCHANGE,
        }
    }

    /// Pause between expiries; zero means none.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.unwrap_or(0))
    }

    /// Pause after each analytics call.
    pub fn api_call_pause(&self) -> Duration {
        Duration::from_millis(self.api_call_pause_ms.unwrap_or(DEFAULT_API_CALL_PAUSE_MS))
    }

    /// The `{timeout, retries, delay}` triple for the caller's retry layer.
    ///
    /// Defaults: 600 s timeout, no retries, 100 ms delay when retries are set
    /// without a delay.
    pub fn retry_policy(&self) -> RetryPolicy {
        let retries = self.retries.unwrap_or(0);
        let delay_ms = match self.delay_ms {
            Some(d) if d > 0 => d,
            _ if retries > 0 => 100,
            _ => 0,
        };
        RetryPolicy {
            timeout: Duration::from_millis(self.timeout_ms.unwrap_or(600_000)),
            retries,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Task Kind
// ---------------------------------------------------------------------------

/// The download handlers a task can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// All NSE index levels (CSV).
    AllIndices,
    /// Equity gainers/losers (CSV).
    EquityData,
    /// NSE option chain, one snapshot per expiry (JSON).
    OptionChain,
    /// Option chain from the analytics service, enriched and persisted.
    LtpCalculator,
}

impl TaskKind {
    /// Name carried in bus notifications.
    pub fn task_name(self) -> &'static str {
        match self {
            Self::AllIndices => "allIndices",
            Self::EquityData => "equityData",
            Self::OptionChain => "optionchain",
            Self::LtpCalculator => "ltpCalculator",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task_name())
    }
}

impl FromStr for TaskKind {
    type Err = FeedError;

    /// Trim, lowercase and drop `-`/`_` separators, then match.
    fn from_str(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "" => Err(FeedError::InvalidTask("kind is required".into())),
            "allindices" => Ok(Self::AllIndices),
            "equity" | "equitydata" => Ok(Self::EquityData),
            "optionchain" | "optionchange" => Ok(Self::OptionChain),
            "ltp" | "ltpcalculator" => Ok(Self::LtpCalculator),
            _ => Err(FeedError::UnknownTaskKind(raw.to_owned())),
        }
    }
}
