//! NSE option chain, one snapshot per expiry.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::client::FetchClient;
use crate::constants::{DEFAULT_REQUEST_TIMEOUT_MS, NSE_OPTION_CHAIN_URL, NSE_REFERER_OPTIONS, keys};
use crate::error::{FeedError, Result};
use crate::expiry::{extract_expiries, normalize_expiry, parse_expiry};
use crate::persist::ChainContext;
use crate::pipeline::Pipeline;
use crate::types::nse::NseOptionChain;
use crate::types::{Task, TaskKind};

impl Pipeline {
    /// Download the chain for the first `expiryCount` expiries of the task's
    /// symbol, strictly in expiry-list order.
    ///
    /// Fails when the expiry list cannot be loaded or yields no dates. A
    /// failure for one expiry is recorded in that expiry's outcome and the
    /// remaining expiries still run. Outcomes are joined with `" | "`.
    pub async fn download_option_chain(&self, task: &Task) -> Result<String> {
        let symbol = task.symbol_or_default();
        let timeout = task.request_timeout(DEFAULT_REQUEST_TIMEOUT_MS);

        let contract_info = self.expiries.get_expiries(symbol, timeout).await?;
        let expiries = extract_expiries(&contract_info, task.expiry_count());
        if expiries.is_empty() {
            return Err(FeedError::NoExpiryDates(symbol.to_owned()));
        }
        tracing::info!(symbol, ?expiries, "processing option-chain expiries");

        let mut outcomes = Vec::with_capacity(expiries.len());
        for (i, raw) in expiries.iter().enumerate() {
            let delay = task.delay();
            if i > 0 && !delay.is_zero() {
                tracing::debug!(delay_ms = delay.as_millis() as u64, "pausing between expiries");
                tokio::time::sleep(delay).await;
            }

            let outcome = match self.option_chain_for_expiry(task, symbol, raw, timeout).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(symbol, expiry = %raw, error = %err, "option-chain expiry failed");
                    format!("Error: optionChain for expiry {raw} - {err}")
                }
            };
            outcomes.push(format!("Expiry {raw}: {outcome}"));
        }

        Ok(outcomes.join(" | "))
    }

    /// One expiry. Keys, labels and the persisted expiry use `expiry` as the
    /// contract-info listed it; only the request URL uses the NSE
    /// `dd-Mon-yyyy` form.
    ///
    /// Any well-formed JSON body is stored and notified. Rows are enriched and
    /// persisted only when the body also decodes as an NSE chain.
    async fn option_chain_for_expiry(
        &self,
        task: &Task,
        symbol: &str,
        expiry: &str,
        timeout: Duration,
    ) -> Result<String> {
        let url = Url::parse_with_params(
            NSE_OPTION_CHAIN_URL,
            &[
                ("type", "Indices"),
                ("symbol", symbol),
                ("expiry", normalize_expiry(expiry).as_str()),
            ],
        )?;
        let resp = self
            .fetcher
            .get(url.as_str(), FetchClient::nse_headers(NSE_REFERER_OPTIONS), timeout)
            .await?;

        if !resp.is_success() {
            return Ok(format!("Error: optionChain HTTP {} from URL: {url}", resp.status));
        }

        let body = resp.text();
        let value: Value = serde_json::from_str(&body)?;

        let base = keys::option_chain(symbol, expiry);
        let redis_keys = self
            .publish_snapshot(TaskKind::OptionChain.task_name(), &base, &body)
            .await;

        match serde_json::from_value::<NseOptionChain>(value) {
            Ok(payload) if payload.is_empty() => {
                tracing::debug!(symbol, expiry, "chain has no rows, skipping enrichment");
            }
            Ok(payload) => {
                let mut chain = payload.into_chain(symbol, parse_expiry(expiry), expiry);
                self.enrich(&mut chain, task.exchange_or_default(), task.api_call_pause())
                    .await;
                let context = ChainContext::new(self.server_name.clone(), symbol, expiry);
                self.record_chain(&chain, &context, &base).await;
            }
            Err(err) => {
                tracing::warn!(symbol, expiry, error = %err, "chain rows not decodable, skipping enrichment");
            }
        }

        Ok(format!(
            "OK: optionChain downloaded for {symbol} expiry {expiry}, length={}, redisKeys={redis_keys}",
            body.len()
        ))
    }
}
