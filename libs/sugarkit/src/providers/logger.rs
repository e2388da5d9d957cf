use async_trait::async_trait;
use std::sync::Arc;

use super::keys;
use crate::config::AppConfig;
use crate::container::Application;
use crate::logging::{self, Logger};
use crate::provider::ServiceProvider;

/// Installs the logging pipeline and binds the resulting [`Logger`].
pub struct LoggerServiceProvider {
    config: Arc<AppConfig>,
}

impl LoggerServiceProvider {
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ServiceProvider for LoggerServiceProvider {
    fn name(&self) -> &str {
        "logger"
    }

    fn register(&self, _app: &Application) {}

    async fn boot(&self, app: &Application) -> anyhow::Result<()> {
        let logger = logging::init(&self.config.logger)?;
        tracing::info!(
            filter = logger.filter(),
            format = ?logger.format(),
            file = ?logger.file(),
            global = logger.is_global(),
            "Logger initialized"
        );
        app.bind::<Logger>(keys::LOGGER, Arc::new(logger));
        Ok(())
    }
}
