//! Capabilities bound into the container by the built-in providers.
//!
//! Each subsystem is a [`Manager`] of named backends behind a trait object:
//! [`DatabaseManager`], [`CacheManager`], [`StorageManager`], [`QueueManager`].
//! Providers bind an empty manager during `register` and fill it during `boot`.

pub mod cache;
pub mod database;
pub mod manager;
pub mod queue;
pub mod storage;

pub use cache::{CacheManager, CacheStore, MemoryStore};
pub use database::{DatabaseManager, DbConnection, DbConnector, SqlxConnector};
pub use manager::{Manager, ManagerError};
pub use queue::{Job, MemoryQueue, Queue, QueueManager};
pub use storage::{Disk, LocalDisk, StorageManager};

#[cfg(feature = "redis")]
pub use cache::RedisStore;
#[cfg(feature = "redis")]
pub use queue::RedisQueue;
