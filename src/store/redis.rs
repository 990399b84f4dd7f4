//! Redis-backed [`KeyValueStore`].

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::Result;
use crate::store::KeyValueStore;

/// Redis connection shared by every component in the process.
///
/// [`ConnectionManager`] multiplexes one connection and reconnects on
/// failure, so cloning a `RedisStore` is cheap.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://:password@localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("redis connection established");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        tracing::debug!(key, found = value.is_some(), "redis GET");
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(key).await?;
        Ok(found)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value).await?;
        tracing::debug!(key, value_len = value.len(), "redis SET");
        Ok(())
    }
}
