//! Change notifications.
//!
//! After a snapshot is fetched and rotated (or fetched with no cache store
//! configured) the handler emits a small
//! `{"taskName": ..., "timestamp": ...}` message, keyed by the snapshot's
//! `<base>:current` key, to one topic shared by every task kind. Consumers
//! re-read the cache store on receipt; the message itself carries no data.

#[cfg(feature = "kafka")]
mod kafka;

#[cfg(feature = "kafka")]
pub use kafka::KafkaNotifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Notification message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub task_name: String,
    /// ISO-8601 instant of the download that triggered the message.
    pub timestamp: String,
}

impl Notification {
    pub fn new(task_name: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A message bus that accepts keyed string payloads.
///
/// Implementations create the topic on first use if it does not exist.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_uses_camel_case_field_names() {
        let n = Notification::new("allIndices", "2026-02-03T09:15:00+00:00");
        assert_eq!(
            n.to_json().unwrap(),
            r#"{"taskName":"allIndices","timestamp":"2026-02-03T09:15:00+00:00"}"#
        );
    }
}
