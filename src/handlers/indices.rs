//! All-indices and equity-variations snapshots (CSV).

use std::time::Duration;

use crate::client::FetchClient;
use crate::constants::{
    DEFAULT_EQUITY_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT_MS, NSE_ALL_INDICES_URL, NSE_EQUITY_DATA_URL,
    NSE_REFERER_INDICES, keys,
};
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::types::{Task, TaskKind};

impl Pipeline {
    /// Download the all-indices CSV and rotate it under `nse:allindices`.
    pub async fn download_all_indices(&self, task: &Task) -> Result<String> {
        self.download_csv(
            TaskKind::AllIndices,
            NSE_ALL_INDICES_URL,
            keys::ALL_INDICES,
            task.request_timeout(DEFAULT_REQUEST_TIMEOUT_MS),
        )
        .await
    }

    /// Download the equity gainers/losers CSV and rotate it under
    /// `nse:equitydata`.
    pub async fn download_equity_data(&self, task: &Task) -> Result<String> {
        self.download_csv(
            TaskKind::EquityData,
            NSE_EQUITY_DATA_URL,
            keys::EQUITY_DATA,
            task.request_timeout(DEFAULT_EQUITY_TIMEOUT_MS),
        )
        .await
    }

    async fn download_csv(
        &self,
        kind: TaskKind,
        url: &str,
        base: &str,
        timeout: Duration,
    ) -> Result<String> {
        let name = kind.task_name();
        let headers = FetchClient::nse_headers(NSE_REFERER_INDICES);

        let resp = match self.fetcher.get(url, headers, timeout).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(task = name, %url, error = %err, "download failed");
                return Ok(format!("Error: {name} {err}"));
            }
        };

        if !resp.is_success() {
            tracing::warn!(task = name, %url, status = resp.status, "download rejected");
            return Ok(format!("Error: {name} HTTP {}", resp.status));
        }

        let data = resp.text();
        let redis_keys = self.publish_snapshot(name, base, &data).await;
        Ok(format!(
            "OK: {name} downloaded, length={}, redisKeys={redis_keys}",
            data.len()
        ))
    }
}
