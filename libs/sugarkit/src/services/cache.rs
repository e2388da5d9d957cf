//! Key/value cache stores.
//!
//! Values are strings; callers serialize whatever they need. A store that cannot
//! reach its backend reports the error, it never silently misses.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::manager::Manager;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Store `value`; with `ttl` the entry expires after that duration.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    async fn has(&self, key: &str) -> anyhow::Result<bool>;

    /// Drop every entry of this store.
    async fn flush(&self) -> anyhow::Result<()>;
}

/// Named cache stores; bound under `"cache"`.
pub type CacheManager = Manager<dyn CacheStore>;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Process-local store. Expired entries are evicted lazily on access.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let value = self
            .entries
            .get(key)
            .and_then(|e| e.is_live(now).then(|| e.value.clone()));
        if value.is_none() {
            self.entries.remove_if(key, |_, e| !e.is_live(now));
        }
        value
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_owned(),
            Entry {
                value: value.to_owned(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn has(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.entries.clear();
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub use self::redis_store::RedisStore;

#[cfg(feature = "redis")]
mod redis_store {
    use anyhow::Context;
    use async_trait::async_trait;
    use redis::{AsyncCommands, aio::ConnectionManager};
    use std::time::Duration;

    use super::CacheStore;
    use crate::config::RedisConfig;

    /// Every key this store writes lives under this prefix, so `flush` never
    /// touches queue lists or foreign data sharing the database.
    pub(super) const KEY_PREFIX: &str = "cache:";

    const SCAN_BATCH: usize = 200;

    pub(super) fn namespaced(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    /// Millisecond expiry for `PSETEX`; redis rejects zero.
    pub(super) fn expiry_millis(ttl: Duration) -> u64 {
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
    }

    /// Redis-backed store sharing one multiplexed connection.
    #[derive(Clone)]
    pub struct RedisStore {
        conn: ConnectionManager,
    }

    impl RedisStore {
        /// Connect to the server described by `cfg`.
        ///
        /// # Errors
        /// Fails if the URL is invalid or the server is unreachable.
        pub async fn connect(cfg: &RedisConfig) -> anyhow::Result<Self> {
            let client = redis::Client::open(cfg.url()).context("invalid redis url")?;
            let conn = ConnectionManager::new(client)
                .await
                .with_context(|| format!("failed to connect redis {}:{}", cfg.host, cfg.port))?;
            Ok(Self { conn })
        }
    }

    #[async_trait]
    impl CacheStore for RedisStore {
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            let mut conn = self.conn.clone();
            Ok(conn.get::<_, Option<String>>(namespaced(key)).await?)
        }

        async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
            let mut conn = self.conn.clone();
            let key = namespaced(key);
            match ttl {
                Some(ttl) => {
                    conn.pset_ex::<_, _, ()>(key, value, expiry_millis(ttl))
                        .await?;
                }
                None => conn.set::<_, _, ()>(key, value).await?,
            }
            Ok(())
        }

        async fn delete(&self, key: &str) -> anyhow::Result<()> {
            let mut conn = self.conn.clone();
            conn.del::<_, ()>(namespaced(key)).await?;
            Ok(())
        }

        async fn has(&self, key: &str) -> anyhow::Result<bool> {
            let mut conn = self.conn.clone();
            Ok(conn.exists::<_, bool>(namespaced(key)).await?)
        }

        async fn flush(&self) -> anyhow::Result<()> {
            let mut conn = self.conn.clone();
            let pattern = format!("{KEY_PREFIX}*");
            let mut cursor: u64 = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await
                    .context("scan cache keys")?;
                if !keys.is_empty() {
                    conn.del::<_, ()>(keys).await?;
                }
                if next == 0 {
                    return Ok(());
                }
                cursor = next;
            }
        }
    }

    impl std::fmt::Debug for RedisStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisStore").finish_non_exhaustive()
        }
    }
}
