//! Redis-backed key-value store

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use crate::credentials::{KeyValueStore, StoreFuture};
use crate::error::{Error, Result};

/// Credential backend talking to Redis through a reconnecting
/// `ConnectionManager`. Cloning the manager is cheap; each call uses its own
/// clone so concurrent requests don't serialize on a lock.
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Store(format!("invalid redis url: {e}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Store(format!("connecting to redis: {e}")))?;
        info!("connected to redis credential store");
        Ok(Self { connection })
    }
}

impl KeyValueStore for RedisStore {
    fn backend(&self) -> &str {
        "redis"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let mut conn = self.connection.clone();
            let value: Option<String> = conn
                .get(key)
                .await
                .map_err(|e| Error::Store(format!("redis GET {key} failed: {e}")))?;
            debug!(key, hit = value.is_some(), "redis GET");
            Ok(value)
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut conn = self.connection.clone();
            conn.set::<_, _, ()>(key, value)
                .await
                .map_err(|e| Error::Store(format!("redis SET {key} failed: {e}")))?;
            debug!(key, "redis SET");
            Ok(())
        })
    }
}
