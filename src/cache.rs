use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Cache key for a user's identity snapshot. Case-sensitive; the resolver
/// reads and writes exactly this string.
pub fn user_key(username: &str) -> String {
    format!("user:{}", username)
}

/// Best-effort cache client. The cache is an accelerator, not a dependency:
/// every failure (no URL configured, server down, bad payload) degrades to a
/// miss or a no-op, and the caller falls back to Postgres.
///
/// Backends: Redis in deployments, a process-local map for tests and
/// single-process runs, or disabled entirely.
#[derive(Clone)]
pub struct Cache {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Disabled,
    Redis(Client),
    Memory(Arc<Mutex<HashMap<String, (String, Instant)>>>),
}

impl Cache {
    pub fn connect(url: Option<&str>) -> Self {
        let backend = match url {
            Some(url) => match Client::open(url) {
                Ok(c) => {
                    tracing::info!("redis client created");
                    Backend::Redis(c)
                }
                Err(e) => {
                    warn!(error = %e, "invalid redis url, cache disabled");
                    Backend::Disabled
                }
            },
            None => {
                tracing::info!("REDIS_URL not set, cache disabled");
                Backend::Disabled
            }
        };
        Self { backend }
    }

    pub fn disabled() -> Self {
        Self {
            backend: Backend::Disabled,
        }
    }

    /// Process-local map with the same get/set/delete semantics, TTL
    /// included. No external service needed.
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    async fn redis_conn(client: &Client) -> Option<MultiplexedConnection> {
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!(error = %e, "redis unreachable");
                None
            }
        }
    }

    /// Miss on absent key, disabled cache, connection failure, an expired
    /// entry, or a payload that no longer deserializes.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match &self.backend {
            Backend::Disabled => return None,
            Backend::Redis(client) => {
                let mut conn = Self::redis_conn(client).await?;
                match conn.get::<_, Option<String>>(key).await {
                    Ok(v) => v?,
                    Err(e) => {
                        warn!(error = %e, key, "redis GET failed");
                        return None;
                    }
                }
            }
            Backend::Memory(map) => {
                let mut map = map.lock().ok()?;
                match map.get(key) {
                    Some((_, expires_at)) if *expires_at <= Instant::now() => {
                        map.remove(key);
                        return None;
                    }
                    Some((raw, _)) => raw.clone(),
                    None => return None,
                }
            }
        };
        match serde_json::from_str(&raw) {
            Ok(v) => {
                debug!(key, "cache hit");
                Some(v)
            }
            Err(e) => {
                warn!(error = %e, key, "stale cache payload dropped");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, key, "cache serialization failed");
                return;
            }
        };
        match &self.backend {
            Backend::Disabled => {}
            Backend::Redis(client) => {
                let Some(mut conn) = Self::redis_conn(client).await else {
                    return;
                };
                let res: redis::RedisResult<()> = conn.set_ex(key, raw, ttl.as_secs()).await;
                if let Err(e) = res {
                    warn!(error = %e, key, "redis SET failed");
                } else {
                    debug!(key, ttl = ttl.as_secs(), "cache set");
                }
            }
            Backend::Memory(map) => {
                if let Ok(mut map) = map.lock() {
                    map.insert(key.to_string(), (raw, Instant::now() + ttl));
                }
            }
        }
    }

    pub async fn delete(&self, key: &str) {
        match &self.backend {
            Backend::Disabled => {}
            Backend::Redis(client) => {
                let Some(mut conn) = Self::redis_conn(client).await else {
                    return;
                };
                let res: redis::RedisResult<()> = conn.del(key).await;
                if let Err(e) = res {
                    warn!(error = %e, key, "redis DEL failed");
                }
            }
            Backend::Memory(map) => {
                if let Ok(mut map) = map.lock() {
                    map.remove(key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_key_format() {
        assert_eq!(user_key("alice"), "user:alice");
        // case-sensitive, no normalization
        assert_eq!(user_key("Alice"), "user:Alice");
    }

    #[tokio::test]
    async fn disabled_cache_is_a_silent_miss() {
        let cache = Cache::disabled();
        let got: Option<String> = cache.get("user:anyone").await;
        assert!(got.is_none());
        // writes and deletes are no-ops, never errors
        cache
            .set("user:anyone", &"snapshot".to_string(), Duration::from_secs(10))
            .await;
        cache.delete("user:anyone").await;
        let got: Option<String> = cache.get("user:anyone").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn connect_without_url_yields_disabled_cache() {
        let cache = Cache::connect(None);
        let got: Option<String> = cache.get("user:anyone").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn invalid_url_yields_disabled_cache() {
        let cache = Cache::connect(Some("not-a-redis-url"));
        let got: Option<String> = cache.get("user:anyone").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn memory_backend_round_trip() {
        let cache = Cache::memory();
        cache
            .set("user:alice", &"payload".to_string(), Duration::from_secs(60))
            .await;
        let got: Option<String> = cache.get("user:alice").await;
        assert_eq!(got.as_deref(), Some("payload"));

        cache.delete("user:alice").await;
        let got: Option<String> = cache.get("user:alice").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn memory_backend_expires_entries() {
        let cache = Cache::memory();
        cache
            .set("user:alice", &"payload".to_string(), Duration::ZERO)
            .await;
        let got: Option<String> = cache.get("user:alice").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_miss() {
        let cache = Cache::memory();
        cache
            .set("user:alice", &"just a string".to_string(), Duration::from_secs(60))
            .await;
        // ask for a different shape than what was stored
        #[derive(serde::Deserialize)]
        struct Shaped {
            #[allow(dead_code)]
            field: u32,
        }
        let got: Option<Shaped> = cache.get("user:alice").await;
        assert!(got.is_none());
    }
}
