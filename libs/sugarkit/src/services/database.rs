//! Named SQL connection pools.
//!
//! Pools are `sqlx::AnyPool`, so one manager can hold `MySQL`, Postgres and `SQLite`
//! connections side by side. Opening a pool goes through [`DbConnector`], which
//! lets tests substitute a connector that never touches the network.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::time::Duration;

use super::manager::Manager;
use crate::config::{ConnectionConfig, DbDriver};

/// One opened pool with its configuration identity.
#[derive(Debug, Clone)]
pub struct DbConnection {
    name: String,
    driver: DbDriver,
    pool: AnyPool,
}

impl DbConnection {
    #[must_use]
    pub fn new(name: impl Into<String>, driver: DbDriver, pool: AnyPool) -> Self {
        Self {
            name: name.into(),
            driver,
            pool,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn driver(&self) -> DbDriver {
        self.driver
    }

    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Round-trip a trivial query.
    ///
    /// # Errors
    /// Propagates the driver error if the pool cannot serve a connection.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .with_context(|| format!("ping {} {}", self.driver, self.name))?;
        Ok(())
    }
}

/// Named connections; bound under `"db"`.
pub type DatabaseManager = Manager<DbConnection>;

/// Opens a pool for one configured connection.
#[async_trait]
pub trait DbConnector: Send + Sync {
    async fn connect(&self, cfg: &ConnectionConfig) -> anyhow::Result<DbConnection>;
}

/// Default connector backed by sqlx's runtime-selected `Any` driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxConnector;

impl SqlxConnector {
    fn pool_options(cfg: &ConnectionConfig) -> AnyPoolOptions {
        let pool = &cfg.pool;
        let mut opts = AnyPoolOptions::new();
        if let Some(max) = pool.max_connections {
            opts = opts.max_connections(max);
        }
        if let Some(min) = pool.min_connections {
            opts = opts.min_connections(min);
        }
        if let Some(secs) = pool.acquire_timeout_secs {
            opts = opts.acquire_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = pool.idle_timeout_secs {
            opts = opts.idle_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = pool.max_lifetime_secs {
            opts = opts.max_lifetime(Duration::from_secs(secs));
        }
        opts
    }
}

#[async_trait]
impl DbConnector for SqlxConnector {
    async fn connect(&self, cfg: &ConnectionConfig) -> anyhow::Result<DbConnection> {
        sqlx::any::install_default_drivers();

        let pool = Self::pool_options(cfg)
            .connect(&cfg.dsn())
            .await
            .with_context(|| format!("failed to connect {} {}", cfg.driver, cfg.name))?;

        Ok(DbConnection::new(&cfg.name, cfg.driver, pool))
    }
}
