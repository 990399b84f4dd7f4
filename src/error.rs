//! Error types for the `nse-feed` crate.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, FeedError>`.
//!
//! [`FeedError`] covers:
//! - **Task errors** — Missing or unroutable task input
//! - **Fetch errors** — Network, TLS, timeout failures from `reqwest`
//! - **HTTP status errors** — Non-2xx responses, formatted by the handlers
//! - **Decode errors** — Malformed JSON payloads
//! - **Sink errors** — Cache store, relational store, notification bus
//! - **Configuration errors** — Missing or malformed settings
//!
//! Enrichment and persistence failures are never returned from a handler;
//! they are logged and the run continues with partial data.

/// All possible errors produced by the acquisition pipeline.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The task is missing required input (e.g. an empty `kind`).
    #[error("invalid task: {0}")]
    InvalidTask(String),

    /// No handler matches the normalized task kind.
    #[error("unknown task kind: {0}")]
    UnknownTaskKind(String),

    /// A network or transport-level error from `reqwest` (including timeouts).
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The data source answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    NonSuccessStatus {
        /// The HTTP status code.
        status: u16,
        /// The URL that was requested.
        url: String,
    },

    /// Failed to decode a JSON payload.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The expiry reference data yielded no usable dates.
    #[error("no expiry dates for symbol {0}")]
    NoExpiryDates(String),

    /// An analytics call for a single option leg failed.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// A cache-store or relational-store write failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// One attempt exceeded its time budget.
    #[error("attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Publishing to the notification bus failed.
    #[error("notification error: {0}")]
    Notify(String),

    /// The named sink is not configured.
    #[error("{0} sink is not configured")]
    SinkUnavailable(&'static str),

    /// A Redis command or connection failure.
    #[error("cache store error: {0}")]
    Cache(#[from] redis::RedisError),

    /// A relational store failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// An error building or parsing a URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl FeedError {
    /// Whether the outer scheduling layer may reasonably try again.
    ///
    /// Input errors never are; transport and store errors usually are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::Timeout(_) | Self::Cache(_) | Self::Database(_) => true,
            Self::NonSuccessStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FeedError>;
