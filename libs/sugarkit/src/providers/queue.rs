use async_trait::async_trait;
use std::sync::Arc;

use super::keys;
use crate::config::AppConfig;
use crate::container::Application;
use crate::error::ContainerError;
use crate::provider::ServiceProvider;
use crate::services::queue::{MemoryQueue, Queue, QueueManager};

/// Adds the configured queue to the `"queue"` manager under the queue name.
/// Unknown drivers are skipped and the manager stays empty.
pub struct QueueServiceProvider {
    config: Arc<AppConfig>,
}

impl QueueServiceProvider {
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ServiceProvider for QueueServiceProvider {
    fn name(&self) -> &str {
        "queue"
    }

    fn register(&self, app: &Application) {
        app.bind(keys::QUEUE, Arc::new(QueueManager::new("queue connection")));
    }

    async fn boot(&self, app: &Application) -> anyhow::Result<()> {
        let manager = app.make::<QueueManager>(keys::QUEUE)?;
        let cfg = &self.config.queue;

        let queue: Arc<dyn Queue> = match cfg.driver.as_str() {
            "memory" => Arc::new(MemoryQueue::new()),
            #[cfg(feature = "redis")]
            "redis" => Arc::new(
                crate::services::queue::RedisQueue::connect(&cfg.redis, &cfg.name).await?,
            ),
            other => {
                tracing::debug!(driver = other, "Unsupported queue driver; skipping");
                return Ok(());
            }
        };

        manager.add(cfg.name.clone(), queue);
        tracing::info!(driver = %cfg.driver, name = %cfg.name, "Queue ready");
        Ok(())
    }
}

/// Resolve the queue manager bound by [`QueueServiceProvider`].
///
/// # Errors
/// Fails if the provider was never registered.
pub fn manager(app: &Application) -> Result<Arc<QueueManager>, ContainerError> {
    app.make::<QueueManager>(keys::QUEUE)
}
