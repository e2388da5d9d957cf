//! FIFO job queues.
//!
//! A job is an arbitrary JSON document; consumers decide what it means.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::manager::Manager;

pub type Job = serde_json::Value;

#[async_trait]
pub trait Queue: Send + Sync {
    async fn push(&self, job: Job) -> anyhow::Result<()>;

    /// Oldest job, or `None` when the queue is empty. Never blocks waiting for work.
    async fn pop(&self) -> anyhow::Result<Option<Job>>;

    async fn size(&self) -> anyhow::Result<usize>;
}

/// Named queue connections; bound under `"queue"`.
pub type QueueManager = Manager<dyn Queue>;

#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn push(&self, job: Job) -> anyhow::Result<()> {
        self.jobs.lock().push_back(job);
        Ok(())
    }

    async fn pop(&self) -> anyhow::Result<Option<Job>> {
        Ok(self.jobs.lock().pop_front())
    }

    async fn size(&self) -> anyhow::Result<usize> {
        Ok(self.jobs.lock().len())
    }
}

#[cfg(feature = "redis")]
pub use self::redis_queue::RedisQueue;

#[cfg(feature = "redis")]
mod redis_queue {
    use anyhow::Context;
    use async_trait::async_trait;
    use redis::{AsyncCommands, aio::ConnectionManager};

    use super::{Job, Queue};
    use crate::config::RedisConfig;

    /// Queue stored as a redis list: `RPUSH` to enqueue, `LPOP` to dequeue.
    #[derive(Clone)]
    pub struct RedisQueue {
        conn: ConnectionManager,
        key: String,
    }

    impl RedisQueue {
        /// # Errors
        /// Fails if the URL is invalid or the server is unreachable.
        pub async fn connect(cfg: &RedisConfig, name: &str) -> anyhow::Result<Self> {
            let client = redis::Client::open(cfg.url()).context("invalid redis url")?;
            let conn = ConnectionManager::new(client)
                .await
                .with_context(|| format!("failed to connect redis {}:{}", cfg.host, cfg.port))?;
            Ok(Self {
                conn,
                key: format!("queues:{name}"),
            })
        }
    }

    #[async_trait]
    impl Queue for RedisQueue {
        async fn push(&self, job: Job) -> anyhow::Result<()> {
            let payload = serde_json::to_string(&job)?;
            let mut conn = self.conn.clone();
            conn.rpush::<_, _, ()>(&self.key, payload).await?;
            Ok(())
        }

        async fn pop(&self) -> anyhow::Result<Option<Job>> {
            let mut conn = self.conn.clone();
            let raw = conn.lpop::<_, Option<String>>(&self.key, None).await?;
            raw.map(|s| serde_json::from_str(&s).context("malformed job payload"))
                .transpose()
        }

        async fn size(&self) -> anyhow::Result<usize> {
            let mut conn = self.conn.clone();
            Ok(conn.llen::<_, usize>(&self.key).await?)
        }
    }

    impl std::fmt::Debug for RedisQueue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisQueue")
                .field("key", &self.key)
                .finish_non_exhaustive()
        }
    }
}
