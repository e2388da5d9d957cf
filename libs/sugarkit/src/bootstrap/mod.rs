//! Bootstrap orchestrator.
//!
//! Phases, in order:
//! 1. build the container around the configuration;
//! 2. register the default providers (logger, database, cache, storage, queue);
//! 3. boot them;
//! 4. construct the server selected by [`ServerKind`];
//! 5. apply caller options in the order given;
//! 6. boot providers the options registered.
//!
//! Any failure aborts construction and is returned; there is no half-built
//! [`Bootstrap`]. After construction, [`Bootstrap::run`] serves until a shutdown
//! signal and [`Bootstrap::run_until`] until a caller-owned token fires.

use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::container::Application;
use crate::error::BootstrapError;
use crate::providers;
use crate::server::{self, Server, ServerKind};
use crate::shutdown;

mod options;

pub use options::{
    BootstrapOption, with_grpc_services, with_http_router, with_middleware, with_provider,
    with_service,
};

pub struct Bootstrap {
    app: Arc<Application>,
    server: Box<dyn Server>,
}

impl Bootstrap {
    /// Assemble a ready-to-run bootstrap.
    ///
    /// `kind` wins over `config.app.server`; the stored configuration is updated
    /// to match.
    ///
    /// # Errors
    /// [`BootstrapError::Boot`] if a provider fails to boot,
    /// [`BootstrapError::Server`] for an unsupported `kind` or a rejected
    /// registrar, or whatever an option returns.
    pub async fn new(
        kind: ServerKind,
        mut config: AppConfig,
        options: Vec<BootstrapOption>,
    ) -> Result<Self, BootstrapError> {
        config.app.server = kind;
        let config = Arc::new(config);
        let app = Arc::new(Application::new(Arc::clone(&config)));

        tracing::info!("Phase: register");
        for provider in providers::defaults(&config) {
            app.register_arc(provider);
        }

        app.boot().await?;

        tracing::info!(server = %kind, "Phase: server");
        let server = server::build(kind)?;
        let mut bootstrap = Self { app, server };

        if !options.is_empty() {
            tracing::info!(count = options.len(), "Phase: options");
        }
        for option in options {
            option.apply(&mut bootstrap)?;
        }

        bootstrap.app.boot_pending().await?;

        tracing::info!(
            app = %config.app.name,
            mode = %config.app.env,
            server = %kind,
            "Bootstrap ready"
        );
        Ok(bootstrap)
    }

    /// Load configuration from `path` (YAML, plus `APP__*` env) and call [`Bootstrap::new`].
    ///
    /// # Errors
    /// [`BootstrapError::Config`] if the file is missing or invalid, otherwise as
    /// [`Bootstrap::new`].
    pub async fn from_file(
        kind: ServerKind,
        path: impl AsRef<Path>,
        options: Vec<BootstrapOption>,
    ) -> Result<Self, BootstrapError> {
        let config = AppConfig::load(Some(path.as_ref()))?;
        Self::new(kind, config, options).await
    }

    #[must_use]
    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    pub fn server_mut(&mut self) -> &mut dyn Server {
        self.server.as_mut()
    }

    /// Take the container and the server apart, e.g. to drive the server's
    /// router directly in tests.
    #[must_use]
    pub fn into_parts(self) -> (Arc<Application>, Box<dyn Server>) {
        (self.app, self.server)
    }

    /// Serve until SIGINT or SIGTERM.
    ///
    /// # Errors
    /// [`BootstrapError::Server`] if binding or serving fails,
    /// [`BootstrapError::Signal`] if no shutdown signal handler could be
    /// installed (the server is stopped in that case).
    pub async fn run(self) -> Result<(), BootstrapError> {
        let cancel = CancellationToken::new();
        let signals = shutdown::cancel_on_signal(cancel.clone());
        let served = self.run_until(cancel.clone()).await;
        cancel.cancel();
        let watched = signals.await.map_err(std::io::Error::other);
        served?;
        watched.and_then(|r| r).map_err(BootstrapError::Signal)
    }

    /// Serve until `cancel` fires.
    ///
    /// # Errors
    /// [`BootstrapError::Server`] if binding or serving fails.
    pub async fn run_until(self, cancel: CancellationToken) -> Result<(), BootstrapError> {
        let kind = self.server.kind();
        self.server.run(Arc::clone(&self.app), cancel).await?;
        tracing::info!(server = %kind, "Server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("app", &self.app)
            .field("server", &self.server.kind())
            .finish()
    }
}
