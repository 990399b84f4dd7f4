//! PostgreSQL [`ChainStore`].
//!
//! Two append-only tables:
//!
//! - `openalgo_optionchain` — one row per strike per run, CE and PE leg
//!   columns side by side (`ce_*`, `pe_*`). A missing leg is all NULL.
//! - `openalgo_optionchain_summary` — one row per run with the `total_*`,
//!   `above_*` and `below_*` buckets.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};

use crate::error::Result;
use crate::persist::{ChainContext, ChainRun, ChainStore, PreviousOi};
use crate::types::{AggregateBucket, ChainEntry, OptionLeg, Side};

const CHAIN_TABLE: &str = "openalgo_optionchain";
const SUMMARY_TABLE: &str = "openalgo_optionchain_summary";

/// Rows per INSERT statement; 48 binds each keeps well under the protocol limit.
const INSERT_CHUNK: usize = 500;

/// Per-leg columns, in bind order.
const LEG_FIELDS: [&str; 19] = [
    "symbol",
    "label",
    "ltp",
    "bid",
    "ask",
    "open",
    "high",
    "low",
    "prev_close",
    "volume",
    "oi",
    "spot_price",
    "option_price",
    "implied_volatility",
    "days_to_expiry",
    "delta",
    "gamma",
    "theta",
    "vega",
];

const BUCKET_FIELDS: [&str; 6] = [
    "ce_volume",
    "pe_volume",
    "ce_oi",
    "pe_oi",
    "ce_oi_change",
    "pe_oi_change",
];

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

fn leg_column_defs(prefix: &str) -> String {
    [
        ("symbol", "VARCHAR(100)"),
        ("label", "VARCHAR(20)"),
        ("ltp", "DOUBLE PRECISION"),
        ("bid", "DOUBLE PRECISION"),
        ("ask", "DOUBLE PRECISION"),
        ("open", "DOUBLE PRECISION"),
        ("high", "DOUBLE PRECISION"),
        ("low", "DOUBLE PRECISION"),
        ("prev_close", "DOUBLE PRECISION"),
        ("volume", "BIGINT"),
        ("oi", "BIGINT"),
        ("spot_price", "DOUBLE PRECISION"),
        ("option_price", "DOUBLE PRECISION"),
        ("implied_volatility", "DOUBLE PRECISION"),
        ("days_to_expiry", "DOUBLE PRECISION"),
        ("delta", "DOUBLE PRECISION"),
        ("gamma", "DOUBLE PRECISION"),
        ("theta", "DOUBLE PRECISION"),
        ("vega", "DOUBLE PRECISION"),
    ]
    .iter()
    .map(|(name, ty)| format!("{prefix}_{name} {ty}"))
    .collect::<Vec<_>>()
    .join(", ")
}

fn bucket_column_defs(prefix: &str) -> String {
    BUCKET_FIELDS
        .iter()
        .map(|name| format!("{prefix}_{name} BIGINT DEFAULT 0"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn schema_statements() -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {CHAIN_TABLE} (\
             id BIGSERIAL PRIMARY KEY, \
             server_name VARCHAR(100) NOT NULL, \
             underlying VARCHAR(50) NOT NULL, \
             underlying_ltp DOUBLE PRECISION, \
             underlying_prev_close DOUBLE PRECISION, \
             expiry_date VARCHAR(20) NOT NULL, \
             atm_strike DOUBLE PRECISION, \
             strike DOUBLE PRECISION NOT NULL, \
             {}, {}, \
             lotsize BIGINT, \
             tick_size DOUBLE PRECISION, \
             datetime TIMESTAMPTZ NOT NULL)",
            leg_column_defs("ce"),
            leg_column_defs("pe"),
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_server_underlying_expiry ON {CHAIN_TABLE} (server_name, underlying, expiry_date)"),
        format!("CREATE INDEX IF NOT EXISTS idx_datetime ON {CHAIN_TABLE} (datetime)"),
        format!("CREATE INDEX IF NOT EXISTS idx_strike ON {CHAIN_TABLE} (strike)"),
        format!("CREATE INDEX IF NOT EXISTS idx_ce_symbol ON {CHAIN_TABLE} (ce_symbol)"),
        format!("CREATE INDEX IF NOT EXISTS idx_pe_symbol ON {CHAIN_TABLE} (pe_symbol)"),
        format!(
            "CREATE TABLE IF NOT EXISTS {SUMMARY_TABLE} (\
             id BIGSERIAL PRIMARY KEY, \
             server_name VARCHAR(100) NOT NULL, \
             underlying VARCHAR(50) NOT NULL, \
             underlying_ltp DOUBLE PRECISION, \
             expiry_date VARCHAR(20) NOT NULL, \
             datetime TIMESTAMPTZ NOT NULL, \
             {}, {}, {})",
            bucket_column_defs("total"),
            bucket_column_defs("above"),
            bucket_column_defs("below"),
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_summary_server_underlying_expiry ON {SUMMARY_TABLE} (server_name, underlying, expiry_date)"),
        format!("CREATE INDEX IF NOT EXISTS idx_summary_datetime ON {SUMMARY_TABLE} (datetime)"),
    ]
}

// ---------------------------------------------------------------------------
// DML
// ---------------------------------------------------------------------------

fn chain_insert_prefix() -> String {
    let legs = |prefix: &str| {
        LEG_FIELDS
            .iter()
            .map(|f| format!("{prefix}_{f}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "INSERT INTO {CHAIN_TABLE} (server_name, underlying, underlying_ltp, underlying_prev_close, \
         expiry_date, atm_strike, strike, {}, {}, lotsize, tick_size, datetime) ",
        legs("ce"),
        legs("pe"),
    )
}

fn summary_insert_sql() -> String {
    let buckets = ["total", "above", "below"]
        .iter()
        .flat_map(|b| BUCKET_FIELDS.iter().map(move |f| format!("{b}_{f}")))
        .collect::<Vec<_>>();
    let placeholders = (1..=5 + buckets.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {SUMMARY_TABLE} (server_name, underlying, underlying_ltp, expiry_date, datetime, {}) \
         VALUES ({placeholders})",
        buckets.join(", "),
    )
}

fn latest_oi_sql(side: Side) -> String {
    let p = side.column_prefix();
    format!(
        "SELECT symbol, oi FROM (\
           SELECT {p}_symbol AS symbol, {p}_oi AS oi, \
                  ROW_NUMBER() OVER (PARTITION BY {p}_symbol ORDER BY datetime DESC, id DESC) AS rn \
           FROM {CHAIN_TABLE} \
           WHERE server_name = $1 AND underlying = $2 AND expiry_date = $3 AND {p}_symbol IS NOT NULL\
         ) latest WHERE rn = 1"
    )
}

/// Bind the 19 leg columns in [`LEG_FIELDS`] order; NULL for a missing leg.
fn bind_leg(b: &mut Separated<'_, '_, Postgres, &'static str>, leg: Option<&OptionLeg>) {
    let greek = |pick: fn(&crate::types::Greeks) -> Option<f64>| {
        leg.and_then(|l| l.greeks.as_ref()).and_then(pick)
    };
    b.push_bind(leg.and_then(|l| l.symbol.clone()))
        .push_bind(leg.and_then(|l| l.label.clone()))
        .push_bind(leg.map(|l| l.ltp))
        .push_bind(leg.map(|l| l.bid))
        .push_bind(leg.map(|l| l.ask))
        .push_bind(leg.map(|l| l.open))
        .push_bind(leg.map(|l| l.high))
        .push_bind(leg.map(|l| l.low))
        .push_bind(leg.map(|l| l.prev_close))
        .push_bind(leg.map(|l| l.volume))
        .push_bind(leg.map(|l| l.oi))
        .push_bind(leg.and_then(|l| l.spot_price))
        .push_bind(leg.and_then(|l| l.option_price))
        .push_bind(leg.and_then(|l| l.implied_volatility))
        .push_bind(leg.and_then(|l| l.days_to_expiry))
        .push_bind(greek(|g| g.delta))
        .push_bind(greek(|g| g.gamma))
        .push_bind(greek(|g| g.theta))
        .push_bind(greek(|g| g.vega));
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

fn push_bucket<'q>(q: PgQuery<'q>, b: &AggregateBucket) -> PgQuery<'q> {
    q.bind(b.ce_volume)
        .bind(b.pe_volume)
        .bind(b.ce_oi)
        .bind(b.pe_oi)
        .bind(b.ce_oi_change)
        .bind(b.pe_oi_change)
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Chain store over a shared [`PgPool`].
#[derive(Debug, Clone)]
pub struct PgChainStore {
    pool: PgPool,
}

impl PgChainStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(database_url)
            .await?;
        tracing::info!("database pool established");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create both tables and their indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        for stmt in schema_statements() {
            sqlx::query(&stmt).execute(&self.pool).await?;
        }
        tracing::info!(tables = ?[CHAIN_TABLE, SUMMARY_TABLE], "schema ensured");
        Ok(())
    }
}

#[async_trait]
impl ChainStore for PgChainStore {
    async fn latest_oi(&self, context: &ChainContext, side: Side) -> Result<PreviousOi> {
        let rows: Vec<(String, Option<i64>)> = sqlx::query_as(&latest_oi_sql(side))
            .bind(&context.server_name)
            .bind(&context.underlying)
            .bind(&context.expiry_date)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(symbol, oi)| (symbol, oi.unwrap_or(0)))
            .collect())
    }

    async fn insert_run(&self, run: &ChainRun) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let ctx = &run.context;

        for chunk in run.entries.chunks(INSERT_CHUNK) {
            let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(chain_insert_prefix());
            qb.push_values(chunk, |mut b, entry: &ChainEntry| {
                let (ce, pe) = (entry.ce.as_ref(), entry.pe.as_ref());
                b.push_bind(ctx.server_name.clone())
                    .push_bind(ctx.underlying.clone())
                    .push_bind(run.underlying_ltp)
                    .push_bind(run.underlying_prev_close)
                    .push_bind(ctx.expiry_date.clone())
                    .push_bind(run.atm_strike)
                    .push_bind(entry.strike);
                bind_leg(&mut b, ce);
                bind_leg(&mut b, pe);
                b.push_bind(ce.and_then(|l| l.lot_size).or(pe.and_then(|l| l.lot_size)))
                    .push_bind(ce.and_then(|l| l.tick_size).or(pe.and_then(|l| l.tick_size)))
                    .push_bind(run.datetime);
            });
            qb.build().execute(&mut *tx).await?;
        }

        let summary = &run.summary;
        let sql = summary_insert_sql();
        let q = sqlx::query(&sql)
            .bind(&summary.server_name)
            .bind(&summary.underlying)
            .bind(summary.underlying_ltp)
            .bind(&summary.expiry_date)
            .bind(summary.datetime);
        let q = push_bucket(q, &summary.total);
        let q = push_bucket(q, &summary.above_underlying);
        let q = push_bucket(q, &summary.below_underlying);
        q.execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }
}
