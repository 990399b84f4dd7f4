//! Composition root and task router.
//!
//! A [`Pipeline`] owns every collaborator: the HTTP source, and up to four
//! optional sinks (cache store, notification bus, analytics service,
//! relational store). Nothing is global; tests build a pipeline over
//! in-memory doubles with [`PipelineBuilder`], and production code calls
//! [`Pipeline::from_settings`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use nse_feed::client::FetchClient;
//! use nse_feed::store::MemoryStore;
//! use nse_feed::{PipelineBuilder, Task};
//!
//! # #[tokio::main]
//! # async fn main() -> nse_feed::Result<()> {
//! let pipeline = PipelineBuilder::new(Arc::new(FetchClient::new()?))
//!     .store(Arc::new(MemoryStore::new()))
//!     .build();
//!
//! let result = pipeline.handle(&Task::new("allindices")).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```
//!
//! Sink failures never change a handler's result string; they are logged
//! at `warn` and the run continues.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};

use crate::analytics::{AnalyticsProvider, OpenAlgoClient};
use crate::client::{Fetch, FetchClient};
use crate::config::Settings;
use crate::constants::{NOTIFY_TOPIC, keys};
use crate::enrich::enrich_chain;
use crate::error::Result;
use crate::expiry::ExpiryCache;
use crate::notify::{Notification, Notifier};
use crate::persist::{ChainContext, ChainStore, PgChainStore, persist};
use crate::store::{KeyValueStore, RedisStore, SnapshotStore};
use crate::types::{ChainSummary, OptionChain, Task, TaskKind};

/// ISO-8601 UTC instant with millisecond precision.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`Pipeline`]. Only the fetcher is required.
pub struct PipelineBuilder {
    fetcher: Arc<dyn Fetch>,
    store: Option<Arc<dyn KeyValueStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    analytics: Option<Arc<dyn AnalyticsProvider>>,
    chain_store: Option<Arc<dyn ChainStore>>,
    server_name: String,
    notify_topic: String,
}

impl PipelineBuilder {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            store: None,
            notifier: None,
            analytics: None,
            chain_store: None,
            server_name: "nse".to_owned(),
            notify_topic: NOTIFY_TOPIC.to_owned(),
        }
    }

    /// Cache store for snapshots and the expiry cache.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn analytics(mut self, analytics: Arc<dyn AnalyticsProvider>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn chain_store(mut self, chain_store: Arc<dyn ChainStore>) -> Self {
        self.chain_store = Some(chain_store);
        self
    }

    /// Default: `nse`.
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Default: `nse.data`.
    pub fn notify_topic(mut self, topic: impl Into<String>) -> Self {
        self.notify_topic = topic.into();
        self
    }

    pub fn build(self) -> Pipeline {
        let snapshots = self.store.map(SnapshotStore::new);
        let expiries = ExpiryCache::new(self.fetcher.clone(), snapshots.clone());
        Pipeline {
            fetcher: self.fetcher,
            snapshots,
            expiries,
            notifier: self.notifier,
            analytics: self.analytics,
            chain_store: self.chain_store,
            server_name: self.server_name,
            notify_topic: self.notify_topic,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Routes tasks to handlers and owns their collaborators.
pub struct Pipeline {
    pub(crate) fetcher: Arc<dyn Fetch>,
    pub(crate) snapshots: Option<SnapshotStore>,
    pub(crate) expiries: ExpiryCache,
    notifier: Option<Arc<dyn Notifier>>,
    pub(crate) analytics: Option<Arc<dyn AnalyticsProvider>>,
    chain_store: Option<Arc<dyn ChainStore>>,
    pub(crate) server_name: String,
    notify_topic: String,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("cache", &self.snapshots.is_some())
            .field("notifier", &self.notifier.is_some())
            .field("analytics", &self.analytics.is_some())
            .field("chain_store", &self.chain_store.is_some())
            .field("server_name", &self.server_name)
            .field("notify_topic", &self.notify_topic)
            .finish()
    }
}

impl Pipeline {
    /// Connect every sink named in `settings`. A sink whose setting is absent
    /// is left off; a configured sink that cannot connect is an error.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let fetcher = FetchClient::with_connect_timeout(Duration::from_millis(settings.connect_timeout_ms))?;
        let mut builder = PipelineBuilder::new(Arc::new(fetcher))
            .server_name(settings.server_name.clone())
            .notify_topic(settings.notify_topic.clone());

        if let Some(url) = settings.redis_url.as_deref() {
            builder = builder.store(Arc::new(RedisStore::connect(url).await?));
        }

        if let Some(servers) = settings.kafka_bootstrap_servers.as_deref() {
            builder = with_kafka(builder, servers)?;
        }

        if let Some(url) = settings.database_url.as_deref() {
            let store = PgChainStore::connect(url).await?;
            store.ensure_schema().await?;
            builder = builder.chain_store(Arc::new(store));
        }

        if let Some((host, key)) = settings.analytics() {
            builder = builder.analytics(Arc::new(OpenAlgoClient::new(host, key)?));
        }

        let pipeline = builder.build();
        tracing::info!(?pipeline, "pipeline ready");
        Ok(pipeline)
    }

    /// Route `task` to its handler and run it once.
    ///
    /// An empty or unknown kind fails before any I/O. Handler failures at the
    /// fetch or decode step come back as `Ok("Error: ...")`.
    pub async fn handle(&self, task: &Task) -> Result<String> {
        let kind = task.task_kind()?;
        tracing::info!(%kind, symbol = task.symbol.as_deref(), "handling task");

        match kind {
            TaskKind::AllIndices => self.download_all_indices(task).await,
            TaskKind::EquityData => self.download_equity_data(task).await,
            TaskKind::OptionChain => self.download_option_chain(task).await,
            TaskKind::LtpCalculator => self.calculate_ltp(task).await,
        }
    }

    // -----------------------------------------------------------------------
    // Sinks
    // -----------------------------------------------------------------------

    /// Rotate `data` under `base` and notify. Returns the keys written, or
    /// `none` when the cache sink is off or the write failed.
    ///
    /// Without a cache sink the notification still goes out; a failed
    /// rotation suppresses it.
    pub(crate) async fn publish_snapshot(&self, task_name: &str, base: &str, data: &str) -> String {
        let timestamp = now_iso();
        let Some(snapshots) = &self.snapshots else {
            tracing::debug!(base, "cache sink unavailable, snapshot not stored");
            self.notify(task_name, base, &timestamp).await;
            return "none".to_owned();
        };

        if let Err(err) = snapshots.publish(base, data, &timestamp).await {
            tracing::warn!(base, error = %err, "snapshot publish failed");
            return "none".to_owned();
        }

        self.notify(task_name, base, &timestamp).await;
        format!("{base}:current:data,{base}:current:timestamp")
    }

    async fn notify(&self, task_name: &str, base: &str, timestamp: &str) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let payload = match Notification::new(task_name, timestamp).to_json() {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode notification");
                return;
            }
        };
        let key = format!("{base}:current");
        if let Err(err) = notifier.publish(&self.notify_topic, &key, &payload).await {
            tracing::warn!(topic = %self.notify_topic, %key, error = %err, "notification failed");
        }
    }

    /// Run Greeks enrichment when an analytics service is configured.
    pub(crate) async fn enrich(&self, chain: &mut OptionChain, exchange: &str, pause: Duration) {
        match &self.analytics {
            Some(provider) if !chain.chain.is_empty() => {
                enrich_chain(provider.as_ref(), chain, exchange, pause).await;
            }
            Some(_) => tracing::debug!("empty chain, nothing to enrich"),
            None => tracing::debug!("analytics sink unavailable, chain not enriched"),
        }
    }

    /// Persist the chain's OI deltas and cache the resulting summary under
    /// `<chain_base>:summary`. Failures are logged, never returned.
    pub(crate) async fn record_chain(
        &self,
        chain: &OptionChain,
        context: &ChainContext,
        chain_base: &str,
    ) -> Option<ChainSummary> {
        let Some(store) = &self.chain_store else {
            tracing::debug!("relational sink unavailable, chain not persisted");
            return None;
        };
        if chain.chain.is_empty() {
            return None;
        }

        let summary = match persist(store.as_ref(), chain, chain.underlying_ltp, context).await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::error!(
                    underlying = %context.underlying,
                    expiry = %context.expiry_date,
                    error = %err,
                    "chain persistence failed"
                );
                return None;
            }
        };

        if let Some(snapshots) = &self.snapshots {
            let summary_base = keys::summary(chain_base);
            let stored = match serde_json::to_string(&summary) {
                Ok(json) => snapshots.publish(&summary_base, &json, &now_iso()).await,
                Err(err) => Err(err.into()),
            };
            if let Err(err) = stored {
                tracing::warn!(base = %summary_base, error = %err, "summary snapshot failed");
            }
        }
        Some(summary)
    }
}

#[cfg(feature = "kafka")]
fn with_kafka(builder: PipelineBuilder, servers: &str) -> Result<PipelineBuilder> {
    let notifier = crate::notify::KafkaNotifier::new(servers)?;
    Ok(builder.notifier(Arc::new(notifier)))
}

#[cfg(not(feature = "kafka"))]
fn with_kafka(builder: PipelineBuilder, servers: &str) -> Result<PipelineBuilder> {
    tracing::warn!(servers, "KAFKA_BOOTSTRAP_SERVERS set but built without the `kafka` feature");
    Ok(builder)
}
