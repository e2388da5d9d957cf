//! File storage disks.
//!
//! Paths are relative to the disk root and use `/` as separator. Absolute paths
//! and `..` components are rejected so a caller cannot escape the root.

use anyhow::{Context, bail};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::manager::Manager;

#[async_trait]
pub trait Disk: Send + Sync {
    /// Write `contents` to `path`, creating parent directories as needed.
    async fn put(&self, path: &str, contents: &[u8]) -> anyhow::Result<()>;

    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>>;

    async fn delete(&self, path: &str) -> anyhow::Result<()>;

    async fn exists(&self, path: &str) -> anyhow::Result<bool>;

    /// Size in bytes.
    async fn size(&self, path: &str) -> anyhow::Result<u64>;
}

/// Named disks; bound under `"storage"`.
pub type StorageManager = Manager<dyn Disk>;

/// Disk rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let rel = Path::new(path);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!("invalid storage path '{path}'");
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl Disk for LocalDisk {
    async fn put(&self, path: &str, contents: &[u8]) -> anyhow::Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        tokio::fs::write(&full, contents)
            .await
            .with_context(|| format!("write {}", full.display()))
    }

    async fn get(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("read {}", full.display()))
    }

    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete {}", full.display())),
        }
    }

    async fn exists(&self, path: &str) -> anyhow::Result<bool> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full)
            .await
            .with_context(|| format!("stat {}", full.display()))
    }

    async fn size(&self, path: &str) -> anyhow::Result<u64> {
        let full = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .with_context(|| format!("stat {}", full.display()))?;
        Ok(meta.len())
    }
}
