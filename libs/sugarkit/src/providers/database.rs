use async_trait::async_trait;
use std::sync::Arc;

use super::keys;
use crate::config::AppConfig;
use crate::container::Application;
use crate::error::ContainerError;
use crate::provider::ServiceProvider;
use crate::services::database::{DatabaseManager, DbConnector, SqlxConnector};

/// Opens every configured connection, in order, into the `"db"` manager.
///
/// Fail-fast: the first connection that cannot be opened aborts the boot and
/// the remaining ones are not attempted.
pub struct DatabaseServiceProvider {
    config: Arc<AppConfig>,
    connector: Arc<dyn DbConnector>,
}

impl DatabaseServiceProvider {
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self::with_connector(config, Arc::new(SqlxConnector))
    }

    #[must_use]
    pub fn with_connector(config: Arc<AppConfig>, connector: Arc<dyn DbConnector>) -> Self {
        Self { config, connector }
    }
}

#[async_trait]
impl ServiceProvider for DatabaseServiceProvider {
    fn name(&self) -> &str {
        "database"
    }

    fn register(&self, app: &Application) {
        app.bind(keys::DB, Arc::new(DatabaseManager::new("database connection")));
    }

    async fn boot(&self, app: &Application) -> anyhow::Result<()> {
        let manager = app.make::<DatabaseManager>(keys::DB)?;

        for conn_cfg in &self.config.database.connections {
            let conn = self.connector.connect(conn_cfg).await?;
            tracing::info!(
                connection = %conn_cfg.name,
                driver = %conn_cfg.driver,
                "Database connection opened"
            );
            manager.add(conn_cfg.name.clone(), Arc::new(conn));
        }

        if manager.is_empty() {
            tracing::debug!("No database connections configured");
        }
        Ok(())
    }
}

/// Resolve the database manager bound by [`DatabaseServiceProvider`].
///
/// # Errors
/// Fails if the provider was never registered.
pub fn manager(app: &Application) -> Result<Arc<DatabaseManager>, ContainerError> {
    app.make::<DatabaseManager>(keys::DB)
}
