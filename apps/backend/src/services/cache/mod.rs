//! Two-level access token cache.
//!
//! L1 is a process-local map guarded by a `RwLock`. L2 is an optional shared
//! [`TokenStore`] (Redis in production) so that several instances reuse the
//! same client-credentials tokens. L2 failures never fail a request.

mod redis_store;

pub use redis_store::RedisTokenStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::Result;

/// Seconds shaved off every TTL so a token is never used right at expiry.
pub const SAFETY_MARGIN_SECS: u64 = 60;

/// TTL given to tokens promoted from L2 into L1.
pub const PROMOTED_TTL_SECS: u64 = 3600;

/// Shared second-level token storage.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store `token` under `key` for `ttl`.
    async fn set(&self, key: &str, token: &str, ttl: Duration) -> Result<()>;

    /// Fetch an unexpired token, `None` on a miss.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// A cached token and the instant it stops being valid.
#[derive(Debug, Clone)]
struct CredentialRecord {
    token: String,
    expires_at: Instant,
}

impl CredentialRecord {
    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Lifetime actually granted to a token with the given TTL.
///
/// The safety margin only applies when it leaves a positive lifetime.
pub fn effective_ttl(ttl: Duration) -> Duration {
    let margin = Duration::from_secs(SAFETY_MARGIN_SECS);
    if ttl > margin {
        ttl - margin
    } else {
        ttl
    }
}

/// Token cache shared by every authenticated catalog adapter.
pub struct TokenCache {
    local: RwLock<HashMap<String, CredentialRecord>>,
    shared: Option<Arc<dyn TokenStore>>,
}

impl TokenCache {
    /// Cache with no shared level.
    pub fn new() -> Self {
        Self {
            local: RwLock::new(HashMap::new()),
            shared: None,
        }
    }

    /// Cache backed by a shared store.
    pub fn with_store(store: Arc<dyn TokenStore>) -> Self {
        Self {
            local: RwLock::new(HashMap::new()),
            shared: Some(store),
        }
    }

    /// Create a token cache wrapped in Arc for shared access.
    pub fn new_shared(store: Option<Arc<dyn TokenStore>>) -> Arc<Self> {
        Arc::new(match store {
            Some(store) => Self::with_store(store),
            None => Self::new(),
        })
    }

    pub fn has_shared_store(&self) -> bool {
        self.shared.is_some()
    }

    /// Store a token in both levels.
    pub async fn save(&self, key: &str, token: &str, ttl: Duration) {
        let ttl = effective_ttl(ttl);

        {
            let mut local = self.local.write().await;
            local.insert(
                key.to_string(),
                CredentialRecord {
                    token: token.to_string(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }

        if let Some(store) = &self.shared {
            if let Err(e) = store.set(key, token, ttl).await {
                tracing::warn!(key = %key, error = %e, "Failed to write token to shared store");
            }
        }
    }

    /// Current token for `key`, or an empty string when none is cached.
    pub async fn get(&self, key: &str) -> String {
        {
            let local = self.local.read().await;
            if let Some(record) = local.get(key).filter(|r| r.is_live()) {
                return record.token.clone();
            }
        }

        let Some(store) = &self.shared else {
            return String::new();
        };

        match store.get(key).await {
            Ok(Some(token)) if !token.is_empty() => {
                tracing::debug!(key = %key, "Promoting token from shared store");
                let mut local = self.local.write().await;
                local.insert(
                    key.to_string(),
                    CredentialRecord {
                        token: token.clone(),
                        expires_at: Instant::now() + Duration::from_secs(PROMOTED_TTL_SECS),
                    },
                );
                token
            }
            Ok(_) => String::new(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read token from shared store");
                String::new()
            }
        }
    }

    /// Whether `get` would return a token.
    pub async fn is_valid(&self, key: &str) -> bool {
        !self.get(key).await.is_empty()
    }

    /// Drop `key` from both levels.
    pub async fn invalidate(&self, key: &str) {
        self.local.write().await.remove(key);

        if let Some(store) = &self.shared {
            if let Err(e) = store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete token from shared store");
            }
        }
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
