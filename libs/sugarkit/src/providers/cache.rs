use async_trait::async_trait;
use std::sync::Arc;

use super::keys;
use crate::config::AppConfig;
use crate::container::Application;
use crate::error::ContainerError;
use crate::provider::ServiceProvider;
use crate::services::cache::{CacheManager, CacheStore, MemoryStore};

/// Adds the configured cache driver to the `"cache"` manager as `"default"`.
/// Unknown drivers are skipped and the manager stays empty.
pub struct CacheServiceProvider {
    config: Arc<AppConfig>,
}

impl CacheServiceProvider {
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ServiceProvider for CacheServiceProvider {
    fn name(&self) -> &str {
        "cache"
    }

    fn register(&self, app: &Application) {
        app.bind(keys::CACHE, Arc::new(CacheManager::new("cache store")));
    }

    async fn boot(&self, app: &Application) -> anyhow::Result<()> {
        let manager = app.make::<CacheManager>(keys::CACHE)?;
        let cfg = &self.config.cache;

        let store: Arc<dyn CacheStore> = match cfg.driver.as_str() {
            "memory" => Arc::new(MemoryStore::new()),
            #[cfg(feature = "redis")]
            "redis" => Arc::new(crate::services::cache::RedisStore::connect(&cfg.redis).await?),
            other => {
                tracing::debug!(driver = other, "Unsupported cache driver; skipping");
                return Ok(());
            }
        };

        manager.add("default", store);
        tracing::info!(driver = %cfg.driver, "Cache store ready");
        Ok(())
    }
}

/// Resolve the cache manager bound by [`CacheServiceProvider`].
///
/// # Errors
/// Fails if the provider was never registered.
pub fn manager(app: &Application) -> Result<Arc<CacheManager>, ContainerError> {
    app.make::<CacheManager>(keys::CACHE)
}
