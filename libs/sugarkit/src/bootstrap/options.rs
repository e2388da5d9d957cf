use std::fmt;
use std::sync::Arc;

use super::Bootstrap;
use crate::error::BootstrapError;
use crate::provider::ServiceProvider;
use crate::server::{Middleware, Registrar};

type ApplyFn = Box<dyn FnOnce(&mut Bootstrap) -> Result<(), BootstrapError> + Send>;

/// One deferred mutation of a [`Bootstrap`], applied after the default
/// providers have booted and the server exists.
pub struct BootstrapOption {
    name: &'static str,
    apply: ApplyFn,
}

impl BootstrapOption {
    /// Custom option; `name` shows up in logs.
    pub fn new<F>(name: &'static str, apply: F) -> Self
    where
        F: FnOnce(&mut Bootstrap) -> Result<(), BootstrapError> + Send + 'static,
    {
        Self {
            name,
            apply: Box::new(apply),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(super) fn apply(self, bootstrap: &mut Bootstrap) -> Result<(), BootstrapError> {
        tracing::debug!(option = self.name, "Applying bootstrap option");
        (self.apply)(bootstrap)
    }
}

impl fmt::Debug for BootstrapOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapOption")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Append middleware to the server chain. Earlier calls wrap later ones.
#[must_use]
pub fn with_middleware(middleware: Vec<Middleware>) -> BootstrapOption {
    BootstrapOption::new("middleware", move |b| {
        b.server_mut().use_middleware(middleware);
        Ok(())
    })
}

/// Register HTTP routes. Fails on a gRPC server.
#[must_use]
pub fn with_http_router<F>(register: F) -> BootstrapOption
where
    F: FnOnce(axum::Router) -> axum::Router + Send + 'static,
{
    BootstrapOption::new("http_router", move |b| {
        b.server_mut().apply_routes(Registrar::http(register))?;
        Ok(())
    })
}

/// Register gRPC services. Fails on an HTTP server.
#[must_use]
pub fn with_grpc_services<F>(register: F) -> BootstrapOption
where
    F: FnOnce(&mut tonic::service::RoutesBuilder) + Send + 'static,
{
    BootstrapOption::new("grpc_services", move |b| {
        b.server_mut().apply_routes(Registrar::grpc(register))?;
        Ok(())
    })
}

/// Register an extra provider; it boots once all options have been applied.
#[must_use]
pub fn with_provider<P: ServiceProvider>(provider: P) -> BootstrapOption {
    BootstrapOption::new("provider", move |b| {
        b.app().register(provider);
        Ok(())
    })
}

/// Bind a ready-made service into the container.
#[must_use]
pub fn with_service<T>(key: impl Into<String>, service: Arc<T>) -> BootstrapOption
where
    T: ?Sized + Send + Sync + 'static,
{
    let key = key.into();
    BootstrapOption::new("service", move |b| {
        b.app().bind(key, service);
        Ok(())
    })
}
