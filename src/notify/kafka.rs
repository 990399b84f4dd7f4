//! Kafka-backed [`Notifier`].

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tokio::sync::Mutex;

use crate::error::{FeedError, Result};
use crate::notify::Notifier;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Producer plus admin client for one cluster.
///
/// Topics confirmed to exist are remembered, so the metadata round-trip
/// happens once per topic per process.
pub struct KafkaNotifier {
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
    known_topics: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for KafkaNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaNotifier").finish_non_exhaustive()
    }
}

fn notify_err(context: &str, err: impl std::fmt::Display) -> FeedError {
    FeedError::Notify(format!("{context}: {err}"))
}

impl KafkaNotifier {
    /// Build clients for `bootstrap_servers` (comma-separated `host:port`).
    pub fn new(bootstrap_servers: &str) -> Result<Self> {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "5000");

        let producer: FutureProducer = config
            .create()
            .map_err(|e| notify_err("create producer", e))?;
        let admin: AdminClient<DefaultClientContext> = config
            .create()
            .map_err(|e| notify_err("create admin client", e))?;

        tracing::info!(bootstrap_servers, "kafka clients created");
        Ok(Self {
            producer,
            admin,
            known_topics: Mutex::new(HashSet::new()),
        })
    }

    /// Create `topic` with one partition and replication factor 1 if the
    /// cluster does not already have it. "Already exists" counts as success.
    pub async fn ensure_topic(&self, topic: &str) -> Result<()> {
        let mut known = self.known_topics.lock().await;
        if known.contains(topic) {
            return Ok(());
        }

        // librdkafka's metadata call blocks until the broker answers.
        let producer = self.producer.clone();
        let wanted = topic.to_owned();
        let present = tokio::task::spawn_blocking(move || {
            producer
                .client()
                .fetch_metadata(Some(&wanted), METADATA_TIMEOUT)
                .map(|metadata| {
                    metadata.topics().iter().any(|t| {
                        t.name() == wanted && t.error().is_none() && !t.partitions().is_empty()
                    })
                })
        })
        .await
        .map_err(|e| notify_err("metadata task", e))?
        .map_err(|e| notify_err("fetch metadata", e))?;

        if !present {
            let new_topic = NewTopic::new(topic, 1, TopicReplication::Fixed(1));
            let results = self
                .admin
                .create_topics([&new_topic], &AdminOptions::new())
                .await
                .map_err(|e| notify_err("create topic", e))?;
            for result in results {
                match result {
                    Ok(name) => tracing::info!(topic = %name, "kafka topic created"),
                    Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                        tracing::debug!(topic = %name, "kafka topic already exists")
                    }
                    Err((name, code)) => {
                        return Err(notify_err(&format!("create topic {name}"), code));
                    }
                }
            }
        }

        known.insert(topic.to_owned());
        Ok(())
    }
}

#[async_trait]
impl Notifier for KafkaNotifier {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()> {
        self.ensure_topic(topic).await?;

        let record = FutureRecord::to(topic).key(key).payload(payload);
        let (partition, offset) = self
            .producer
            .send(record, SEND_TIMEOUT)
            .await
            .map_err(|(e, _)| notify_err("send", e))?;

        tracing::info!(topic, key, partition, offset, "notification published");
        Ok(())
    }
}
