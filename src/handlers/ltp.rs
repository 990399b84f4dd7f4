//! Analytics-service option chain: fetch, enrich, cache, persist.

use crate::constants::keys;
use crate::error::{FeedError, Result};
use crate::persist::ChainContext;
use crate::pipeline::Pipeline;
use crate::types::{Task, TaskKind};

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(FeedError::InvalidTask(format!("{field} is required"))),
    }
}

impl Pipeline {
    /// Fetch the chain for (symbol, exchange, expiry) from the analytics
    /// service, add Greeks to every leg, rotate it into the cache under
    /// `openalgo:<server>:<symbol>:<expiry>:optionchain` and persist the
    /// OI deltas.
    ///
    /// Returns `"Status: <s>, Underlying: <u>, ATM Strike: <n>"`, or
    /// `"Error: <message> (Status: <s>)"` when the service reports an error.
    pub async fn calculate_ltp(&self, task: &Task) -> Result<String> {
        let symbol = required(task.symbol.as_deref(), "symbol")?;
        let exchange = required(task.exchange.as_deref(), "exchange")?;
        let expiry = required(task.expiry.as_deref(), "expiry")?;
        let strike_range = match task.strike_range {
            Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => return Err(FeedError::InvalidTask("strikeRange must be at least 1".into())),
        };
        let server = task
            .server_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.server_name.as_str());

        let Some(provider) = &self.analytics else {
            return Ok(format!("Error: {}", FeedError::SinkUnavailable("analytics")));
        };

        let mut chain = match provider
            .option_chain(symbol, exchange, expiry, strike_range)
            .await
        {
            Ok(chain) => chain,
            Err(err) => {
                tracing::warn!(symbol, exchange, expiry, error = %err, "option chain request failed");
                return Ok(format!("Error: {err}"));
            }
        };

        let status = chain.status.clone().unwrap_or_else(|| "unknown".to_owned());
        if let Some(message) = chain.reported_error() {
            tracing::warn!(symbol, expiry, %status, reported = message, "analytics service reported an error");
            return Ok(format!("Error: {message} (Status: {status})"));
        }

        self.enrich(&mut chain, exchange, task.api_call_pause()).await;

        let base = keys::analytics_chain(server, symbol, expiry);
        match serde_json::to_string(&chain) {
            Ok(json) => {
                self.publish_snapshot(TaskKind::LtpCalculator.task_name(), &base, &json)
                    .await;
            }
            Err(err) => tracing::warn!(%base, error = %err, "failed to encode enriched chain"),
        }

        let underlying = chain.underlying.clone().unwrap_or_else(|| symbol.to_owned());
        let context = ChainContext::new(server, underlying.as_str(), expiry);
        self.record_chain(&chain, &context, &base).await;

        Ok(format!(
            "Status: {status}, Underlying: {}, ATM Strike: {}",
            chain.underlying.as_deref().unwrap_or("unknown"),
            chain.atm_strike
        ))
    }
}
