//! OI-delta aggregation and the relational chain store.
//!
//! One run of [`persist`]:
//!
//! 1. Load the last persisted OI per CE symbol and per PE symbol for the
//!    (server, underlying, expiry) of the run. One query per side.
//! 2. Compute per-strike OI change and the `total`/`above`/`below` buckets.
//! 3. Write one row per strike plus one summary row, as a single batch.

mod aggregate;
mod postgres;

pub use aggregate::{Aggregates, PreviousOi, aggregate, oi_change, strike_figures};
pub use postgres::PgChainStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{ChainEntry, ChainSummary, OptionChain, Side};

/// Identity of the chain being persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainContext {
    pub server_name: String,
    pub underlying: String,
    pub expiry_date: String,
}

impl ChainContext {
    pub fn new(
        server_name: impl Into<String>,
        underlying: impl Into<String>,
        expiry_date: impl Into<String>,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            underlying: underlying.into(),
            expiry_date: expiry_date.into(),
        }
    }
}

/// Everything written for one run: chain-level fields, the strike rows and
/// the summary row, all stamped with the same `datetime`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRun {
    pub context: ChainContext,
    pub underlying_ltp: f64,
    pub underlying_prev_close: f64,
    pub atm_strike: f64,
    pub datetime: DateTime<Utc>,
    pub entries: Vec<ChainEntry>,
    pub summary: ChainSummary,
}

/// Append-only store of strike rows and run summaries.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Latest persisted OI for every distinct symbol on `side` within
    /// `context`. Ties on write time resolve to the last inserted row.
    async fn latest_oi(&self, context: &ChainContext, side: Side) -> Result<PreviousOi>;

    /// Write every strike row and the summary row of `run` atomically.
    async fn insert_run(&self, run: &ChainRun) -> Result<()>;
}

/// Aggregate `chain` against previously persisted OI and store the run.
pub async fn persist(
    store: &dyn ChainStore,
    chain: &OptionChain,
    underlying_ltp: f64,
    context: &ChainContext,
) -> Result<ChainSummary> {
    let prev_ce = store.latest_oi(context, Side::Call).await?;
    let prev_pe = store.latest_oi(context, Side::Put).await?;
    tracing::debug!(
        underlying = %context.underlying,
        expiry = %context.expiry_date,
        ce_symbols = prev_ce.len(),
        pe_symbols = prev_pe.len(),
        "previous OI loaded"
    );

    let agg = aggregate(&chain.chain, underlying_ltp, &prev_ce, &prev_pe);
    let datetime = Utc::now();
    let summary = ChainSummary {
        server_name: context.server_name.clone(),
        underlying: context.underlying.clone(),
        underlying_ltp,
        expiry_date: context.expiry_date.clone(),
        datetime,
        total: agg.total,
        above_underlying: agg.above_underlying,
        below_underlying: agg.below_underlying,
    };

    let run = ChainRun {
        context: context.clone(),
        underlying_ltp,
        underlying_prev_close: chain.underlying_prev_close,
        atm_strike: chain.atm_strike,
        datetime,
        entries: chain.chain.clone(),
        summary: summary.clone(),
    };
    store.insert_run(&run).await?;

    tracing::info!(
        underlying = %context.underlying,
        expiry = %context.expiry_date,
        rows = run.entries.len(),
        total_ce_oi_change = summary.total.ce_oi_change,
        total_pe_oi_change = summary.total.pe_oi_change,
        "chain persisted"
    );
    Ok(summary)
}
