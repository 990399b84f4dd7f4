//! Cache-store access.
//!
//! [`KeyValueStore`] is the minimal string key/value surface the pipeline
//! needs. [`RedisStore`] backs it in production; [`MemoryStore`] is a
//! process-local stand-in for development and tests. [`SnapshotStore`] adds
//! the current/previous rotation on top.

pub mod memory;
pub mod redis;
pub mod snapshot;

use async_trait::async_trait;

use crate::error::Result;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;
pub use self::snapshot::{Snapshot, SnapshotStore};

/// String key/value store with passthrough semantics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Whether `key` holds a value.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Overwrite `key` with `value`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
