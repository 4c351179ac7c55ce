//! Redis-backed [`TokenStore`].

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::TokenStore;
use crate::error::{AppError, Result};

const KEY_PREFIX: &str = "token:";

/// Stored value: the token and its absolute expiry in unix seconds.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    expires_at: u64,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn redis_key(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

/// Token store sharing credentials between instances through Redis.
pub struct RedisTokenStore {
    connection: ConnectionManager,
}

impl RedisTokenStore {
    /// Connect to `url`. The connection manager reconnects on its own afterwards.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    /// Connect and wrap in Arc for shared access.
    pub async fn connect_shared(url: &str) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::connect(url).await?))
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn set(&self, key: &str, token: &str, ttl: Duration) -> Result<()> {
        let seconds = ttl.as_secs().max(1);
        let value = serde_json::to_string(&StoredToken {
            token: token.to_string(),
            expires_at: unix_now() + seconds,
        })
        .map_err(|e| AppError::Internal(format!("Failed to encode token record: {}", e)))?;

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(redis_key(key), value, seconds).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(redis_key(key)).await?;

        Ok(raw.and_then(|raw| decode_live(&raw, unix_now())))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(redis_key(key)).await?;
        Ok(())
    }
}

/// Token from a stored record, unless the record is unreadable or expired.
fn decode_live(raw: &str, now: u64) -> Option<String> {
    match serde_json::from_str::<StoredToken>(raw) {
        Ok(record) if record.expires_at > now && !record.token.is_empty() => Some(record.token),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unreadable token record");
            None
        }
    }
}
