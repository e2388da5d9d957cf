//! Network server abstraction.
//!
//! Exactly one server runs per process. [`build`] picks the variant from a
//! [`ServerKind`]; callers then add middleware and routes, and [`Server::run`]
//! serves until the cancellation token fires.
//!
//! Design goals:
//! - One engine per variant: HTTP owns an `axum::Router`, gRPC owns a
//!   `tonic::service::RoutesBuilder`.
//! - Middleware is transport-neutral ([`middleware::Middleware`]) and applies to
//!   both variants; gRPC routes are served through an axum router underneath.
//! - Route registration is typed per variant ([`Registrar`]); handing a registrar
//!   to the wrong variant is an error, not a silent no-op.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use tokio_util::sync::CancellationToken;

use crate::container::Application;

pub mod grpc;
pub mod http;
pub mod middleware;

pub use grpc::GrpcServer;
pub use http::HttpServer;
pub use middleware::Middleware;

/// Server variant selector, as written in config (`app.server`) and on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Http,
    #[serde(alias = "rpc")]
    Grpc,
    /// Accepted by configuration, but no server implements it.
    Websocket,
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerKind::Http => "http",
            ServerKind::Grpc => "grpc",
            ServerKind::Websocket => "websocket",
        })
    }
}

impl FromStr for ServerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ServerKind::Http),
            "grpc" | "rpc" => Ok(ServerKind::Grpc),
            "websocket" => Ok(ServerKind::Websocket),
            other => Err(format!(
                "unknown server kind '{other}' (expected http, grpc or websocket)"
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server kind '{0}' is not supported")]
    Unsupported(ServerKind),

    #[error("route registrar for {got} cannot be applied to a {expected} server")]
    RegistrarMismatch {
        expected: ServerKind,
        got: ServerKind,
    },

    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} server failed")]
    Serve {
        kind: ServerKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

type HttpRegistrar = Box<dyn FnOnce(axum::Router) -> axum::Router + Send>;
type GrpcRegistrar = Box<dyn FnOnce(&mut tonic::service::RoutesBuilder) + Send>;

/// Route or service registration for one server variant.
pub enum Registrar {
    Http(HttpRegistrar),
    Grpc(GrpcRegistrar),
}

impl Registrar {
    pub fn http<F>(f: F) -> Self
    where
        F: FnOnce(axum::Router) -> axum::Router + Send + 'static,
    {
        Registrar::Http(Box::new(f))
    }

    pub fn grpc<F>(f: F) -> Self
    where
        F: FnOnce(&mut tonic::service::RoutesBuilder) + Send + 'static,
    {
        Registrar::Grpc(Box::new(f))
    }

    #[must_use]
    pub fn kind(&self) -> ServerKind {
        match self {
            Registrar::Http(_) => ServerKind::Http,
            Registrar::Grpc(_) => ServerKind::Grpc,
        }
    }
}

impl fmt::Debug for Registrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Registrar").field(&self.kind()).finish()
    }
}

#[async_trait]
pub trait Server: Send {
    fn kind(&self) -> ServerKind;

    /// Append middleware; the first one ever added is the outermost.
    fn use_middleware(&mut self, middleware: Vec<Middleware>);

    /// Register routes or services.
    ///
    /// # Errors
    /// [`ServerError::RegistrarMismatch`] if `registrar` targets another variant.
    fn apply_routes(&mut self, registrar: Registrar) -> Result<(), ServerError>;

    /// The assembled engine (routes plus middleware) as an axum router.
    fn into_router(self: Box<Self>) -> axum::Router;

    /// Bind `app.host:app.port` from the container's config and serve until
    /// `cancel` fires.
    ///
    /// # Errors
    /// [`ServerError::Bind`] if the address cannot be bound, [`ServerError::Serve`]
    /// if the transport fails while serving.
    async fn run(
        self: Box<Self>,
        app: Arc<Application>,
        cancel: CancellationToken,
    ) -> Result<(), ServerError>;
}

/// Construct the server variant for `kind`.
///
/// # Errors
/// [`ServerError::Unsupported`] for [`ServerKind::Websocket`].
pub fn build(kind: ServerKind) -> Result<Box<dyn Server>, ServerError> {
    match kind {
        ServerKind::Http => Ok(Box::new(HttpServer::new())),
        ServerKind::Grpc => Ok(Box::new(GrpcServer::new())),
        ServerKind::Websocket => Err(ServerError::Unsupported(kind)),
    }
}

async fn bind(app: &Application) -> Result<tokio::net::TcpListener, ServerError> {
    let addr = app.config().address();
    tokio::net::TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}
