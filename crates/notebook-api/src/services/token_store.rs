//! Session token storage.
//!
//! The active session lives under a single key. [`RedisTokenStore`] is used
//! in production; [`MemoryTokenStore`] serves tests and single-process
//! deployments that run without Redis.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use notebook_core::defaults::TOKEN_KEY;
use notebook_core::{Error, Result, TokenStore};

/// Token store backed by Redis.
#[derive(Clone)]
pub struct RedisTokenStore {
    connection: ConnectionManager,
    key: String,
}

impl RedisTokenStore {
    /// Connect to Redis at `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Config(format!("Invalid Redis URL: {e}")))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Cache(format!("Failed to connect to Redis: {e}")))?;

        info!(
            subsystem = "cache",
            component = "token_store",
            "Redis token store connected"
        );
        Ok(Self::with_connection(connection))
    }

    pub fn with_connection(connection: ConnectionManager) -> Self {
        Self {
            connection,
            key: TOKEN_KEY.to_string(),
        }
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn get(&self) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get::<_, Option<String>>(&self.key)
            .await
            .map_err(|e| Error::Cache(format!("Redis GET error: {e}")))
    }

    async fn set(&self, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(&self.key, token, ttl.as_secs().max(1))
            .await
            .map_err(|e| Error::Cache(format!("Redis SET error: {e}")))?;
        debug!(subsystem = "cache", ttl_secs = ttl.as_secs(), "Session token stored");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(&self.key)
            .await
            .map_err(|e| Error::Cache(format!("Redis DEL error: {e}")))?;
        debug!(subsystem = "cache", "Session token deleted");
        Ok(())
    }
}

/// In-process token store. Expiry follows the tokio clock.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<(String, Instant)>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<Option<String>> {
        let slot = self.slot.read().await;
        Ok(slot
            .as_ref()
            .filter(|(_, expires_at)| Instant::now() < *expires_at)
            .map(|(token, _)| token.clone()))
    }

    async fn set(&self, token: &str, ttl: Duration) -> Result<()> {
        *self.slot.write().await = Some((token.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}
