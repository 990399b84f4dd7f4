//! Per-symbol expiry reference cache.
//!
//! The contract-info JSON for a symbol is cached under
//! `nse:optionchain:<symbol>:expiries:{data,timestamp}` and reused until the
//! local calendar day changes. There is no stale fallback: an expired entry
//! must be refreshed, and a failed refresh is an error.

mod extract;
mod format;

pub use extract::{ExtractionStrategy, STRATEGIES, extract_expiries};
pub use format::{normalize_expiry, parse_expiry};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::client::{Fetch, FetchClient};
use crate::constants::{NSE_CONTRACT_INFO_URL, NSE_REFERER_OPTIONS, keys};
use crate::error::{FeedError, Result};
use crate::store::SnapshotStore;

/// Whether a cached entry fetched at `fetched_at` (ISO-8601) is still valid
/// on the local calendar day `today`. Unparseable timestamps are stale.
pub fn is_fresh(fetched_at: &str, today: NaiveDate) -> bool {
    DateTime::parse_from_rfc3339(fetched_at.trim())
        .map(|ts| ts.with_timezone(&Local).date_naive() == today)
        .unwrap_or(false)
}

/// Daily-refresh cache of contract-info JSON.
#[derive(Clone)]
pub struct ExpiryCache {
    fetcher: Arc<dyn Fetch>,
    snapshots: Option<SnapshotStore>,
}

impl std::fmt::Debug for ExpiryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryCache")
            .field("cached", &self.snapshots.is_some())
            .finish_non_exhaustive()
    }
}

impl ExpiryCache {
    /// Without a snapshot store every lookup goes to the network.
    pub fn new(fetcher: Arc<dyn Fetch>, snapshots: Option<SnapshotStore>) -> Self {
        Self { fetcher, snapshots }
    }

    /// Contract-info JSON for `symbol`, from cache when fetched today.
    pub async fn get_expiries(&self, symbol: &str, timeout: Duration) -> Result<String> {
        if let Some(cached) = self.cached_today(symbol).await {
            tracing::info!(symbol, "expiry cache hit");
            return Ok(cached);
        }
        tracing::info!(symbol, "expiry cache miss or stale, fetching contract info");
        self.refresh(symbol, timeout).await
    }

    async fn cached_today(&self, symbol: &str) -> Option<String> {
        let snapshots = self.snapshots.as_ref()?;

        let lookup = async {
            let data = snapshots.get(&keys::expiries_data(symbol)).await?;
            let ts = snapshots.get(&keys::expiries_timestamp(symbol)).await?;
            Ok::<_, FeedError>(data.zip(ts))
        };

        match lookup.await {
            Ok(Some((data, ts))) if !data.is_empty() && is_fresh(&ts, Local::now().date_naive()) => {
                Some(data)
            }
            Ok(Some((_, ts))) => {
                tracing::debug!(symbol, fetched_at = %ts, "cached expiries are from an earlier day");
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(symbol, error = %err, "expiry cache read failed, treating as miss");
                None
            }
        }
    }

    async fn refresh(&self, symbol: &str, timeout: Duration) -> Result<String> {
        let url = url::Url::parse_with_params(NSE_CONTRACT_INFO_URL, &[("symbol", symbol)])?;
        let resp = self
            .fetcher
            .get(url.as_str(), FetchClient::nse_headers(NSE_REFERER_OPTIONS), timeout)
            .await?;

        if !resp.is_success() {
            return Err(FeedError::NonSuccessStatus {
                status: resp.status,
                url: url.into(),
            });
        }

        let json = resp.text();
        if let Some(snapshots) = &self.snapshots {
            let fetched_at = Utc::now().to_rfc3339();
            let stored = async {
                snapshots.set(&keys::expiries_data(symbol), &json).await?;
                snapshots.set(&keys::expiries_timestamp(symbol), &fetched_at).await
            };
            if let Err(err) = stored.await {
                tracing::warn!(symbol, error = %err, "failed to cache contract info");
            }
        }
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, TimeZone};

    #[test]
    fn freshness_is_a_local_calendar_day_boundary() {
        let now = Local::now();
        let today = now.date_naive();

        assert!(is_fresh(&now.to_rfc3339(), today));
        assert!(is_fresh(&now.with_timezone(&Utc).to_rfc3339(), today));

        let two_days_ago = now.checked_sub_days(Days::new(2)).unwrap();
        assert!(!is_fresh(&two_days_ago.to_rfc3339(), today));
    }

    #[test]
    fn start_of_day_is_fresh_and_garbage_is_stale() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        let midnight = Local
            .from_local_datetime(&today.and_hms_opt(0, 0, 1).unwrap())
            .earliest()
            .unwrap();
        assert!(is_fresh(&midnight.to_rfc3339(), today));
        assert!(!is_fresh("yesterday", today));
        assert!(!is_fresh("", today));
    }
}
