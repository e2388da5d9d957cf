use async_trait::async_trait;
use std::sync::Arc;

use super::keys;
use crate::config::AppConfig;
use crate::container::Application;
use crate::error::ContainerError;
use crate::provider::ServiceProvider;
use crate::services::storage::{LocalDisk, StorageManager};

/// Adds every configured disk to the `"storage"` manager.
pub struct StorageServiceProvider {
    config: Arc<AppConfig>,
}

impl StorageServiceProvider {
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ServiceProvider for StorageServiceProvider {
    fn name(&self) -> &str {
        "storage"
    }

    fn register(&self, app: &Application) {
        app.bind(keys::STORAGE, Arc::new(StorageManager::new("storage disk")));
    }

    async fn boot(&self, app: &Application) -> anyhow::Result<()> {
        let manager = app.make::<StorageManager>(keys::STORAGE)?;

        for disk in &self.config.storage.disks {
            match disk.driver.as_str() {
                "local" => {
                    manager.add(disk.name.clone(), Arc::new(LocalDisk::new(&disk.root)));
                    tracing::info!(name = %disk.name, root = %disk.root.display(), "Disk added");
                }
                other => {
                    tracing::debug!(name = %disk.name, driver = other, "Unsupported disk driver; skipping");
                }
            }
        }
        Ok(())
    }
}

/// Resolve the storage manager bound by [`StorageServiceProvider`].
///
/// # Errors
/// Fails if the provider was never registered.
pub fn manager(app: &Application) -> Result<Arc<StorageManager>, ContainerError> {
    app.make::<StorageManager>(keys::STORAGE)
}
