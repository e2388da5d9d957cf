//! Built-in service providers.
//!
//! Default registration order (see [`defaults`]): Logger, Database, Cache, Storage,
//! Queue. The logger comes first so the others can log their own boot.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::provider::ServiceProvider;

pub mod cache;
pub mod database;
pub mod logger;
pub mod queue;
pub mod storage;

pub use cache::CacheServiceProvider;
pub use database::DatabaseServiceProvider;
pub use logger::LoggerServiceProvider;
pub use queue::QueueServiceProvider;
pub use storage::StorageServiceProvider;

/// Service keys bound by the built-in providers.
pub mod keys {
    pub const CONFIG: &str = "config";
    pub const LOGGER: &str = "logger";
    pub const DB: &str = "db";
    pub const CACHE: &str = "cache";
    pub const STORAGE: &str = "storage";
    pub const QUEUE: &str = "queue";
}

/// The fixed default provider set, in boot order.
#[must_use]
pub fn defaults(cfg: &Arc<AppConfig>) -> Vec<Arc<dyn ServiceProvider>> {
    vec![
        Arc::new(LoggerServiceProvider::new(Arc::clone(cfg))),
        Arc::new(DatabaseServiceProvider::new(Arc::clone(cfg))),
        Arc::new(CacheServiceProvider::new(Arc::clone(cfg))),
        Arc::new(StorageServiceProvider::new(Arc::clone(cfg))),
        Arc::new(QueueServiceProvider::new(Arc::clone(cfg))),
    ]
}
