//! Error taxonomy of the bootstrap runtime.
//!
//! - [`ContainerError`]: recoverable lookup failures (`make`).
//! - [`BootError`]: a provider failed its boot step; carries the provider name.
//! - [`BootstrapError`]: anything fatal while assembling a [`crate::Bootstrap`].
//!
//! Server and config errors live next to their modules
//! ([`crate::server::ServerError`], [`crate::config::ConfigError`]) and are
//! wrapped by [`BootstrapError`] when they surface during construction.

use crate::config::ConfigError;
use crate::server::ServerError;

/// Lookup failure when resolving a service from the container.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("service '{key}' not found in container")]
    NotFound { key: String },

    #[error("service '{key}' type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl ContainerError {
    /// Key of the service that failed to resolve.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::NotFound { key } | Self::TypeMismatch { key, .. } => key,
        }
    }
}

/// A provider's boot step failed. Providers after it were not booted.
#[derive(Debug, thiserror::Error)]
#[error("failed to boot provider {provider}: {source:#}")]
pub struct BootError {
    pub provider: String,
    pub source: anyhow::Error,
}

/// Fatal failure while constructing or starting a bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Boot(#[from] BootError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("failed to install shutdown signal handler: {0}")]
    Signal(#[source] std::io::Error),
}
