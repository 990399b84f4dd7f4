//! Current/previous snapshot rotation.
//!
//! A logical unit lives under a base key as two generations:
//!
//! ```text
//! <base>:current:data      <base>:current:timestamp
//! <base>:previous:data     <base>:previous:timestamp
//! ```
//!
//! `previous` always holds what `current` held before the last rotation and
//! is absent after the first write. Rotation is a plain read-then-write, not
//! a transaction: callers guarantee a single writer per base key.

use std::sync::Arc;

use crate::error::Result;
use crate::store::KeyValueStore;

/// One generation of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub data: String,
    /// ISO-8601 instant of the download.
    pub timestamp: String,
}

/// Snapshot operations over a shared [`KeyValueStore`].
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}

fn data_key(base: &str) -> String {
    format!("{base}:data")
}

fn timestamp_key(base: &str) -> String {
    format!("{base}:timestamp")
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Passthrough read.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).await
    }

    /// Passthrough existence check.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.store.exists(key).await
    }

    /// Plain overwrite, no rotation. Used for reference data.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key, value).await
    }

    /// Copy `current_base:{data,timestamp}` to `previous_base:*` where present,
    /// then write the new pair to `current_base:*`.
    ///
    /// Returns whether anything was rotated into `previous`.
    pub async fn rotate(
        &self,
        current_base: &str,
        previous_base: &str,
        data: &str,
        timestamp: &str,
    ) -> Result<bool> {
        let (cur_data, cur_ts) = (data_key(current_base), timestamp_key(current_base));

        let existing_data = self.store.get(&cur_data).await?;
        let existing_ts = self.store.get(&cur_ts).await?;
        let rotated = existing_data.is_some() || existing_ts.is_some();

        if let Some(existing) = existing_data {
            self.store.set(&data_key(previous_base), &existing).await?;
        }
        if let Some(existing) = existing_ts {
            self.store.set(&timestamp_key(previous_base), &existing).await?;
        }

        self.store.set(&cur_data, data).await?;
        self.store.set(&cur_ts, timestamp).await?;

        tracing::debug!(
            current_base,
            previous_base,
            data_len = data.len(),
            rotated,
            "snapshot rotated"
        );
        Ok(rotated)
    }

    /// Rotate under `<base>:current` / `<base>:previous`.
    pub async fn publish(&self, base: &str, data: &str, timestamp: &str) -> Result<bool> {
        self.rotate(
            &format!("{base}:current"),
            &format!("{base}:previous"),
            data,
            timestamp,
        )
        .await
    }

    /// The `current` generation under `base`, if both halves exist.
    pub async fn current(&self, base: &str) -> Result<Option<Snapshot>> {
        self.generation(&format!("{base}:current")).await
    }

    /// The `previous` generation under `base`, if both halves exist.
    pub async fn previous(&self, base: &str) -> Result<Option<Snapshot>> {
        self.generation(&format!("{base}:previous")).await
    }

    async fn generation(&self, prefix: &str) -> Result<Option<Snapshot>> {
        let data = self.store.get(&data_key(prefix)).await?;
        let timestamp = self.store.get(&timestamp_key(prefix)).await?;
        Ok(data.zip(timestamp).map(|(data, timestamp)| Snapshot { data, timestamp }))
    }
}
