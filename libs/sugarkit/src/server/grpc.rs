//! gRPC server variant backed by tonic.
//!
//! Services are collected in a `RoutesBuilder`. At run time the routes are
//! lowered to an axum router, wrapped with the middleware chain, and handed back
//! to tonic's transport.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::service::{Routes, RoutesBuilder};
use tonic::transport::Server as TonicServer;

use super::middleware::{self, Middleware};
use super::{Registrar, Server, ServerError, ServerKind};
use crate::container::Application;

#[derive(Default)]
pub struct GrpcServer {
    routes: RoutesBuilder,
    middleware: Vec<Middleware>,
}

impl GrpcServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn assemble(self) -> Routes {
        let router = middleware::apply(self.routes.routes().into_axum_router(), &self.middleware);
        Routes::from(router)
    }
}

#[async_trait]
impl Server for GrpcServer {
    fn kind(&self) -> ServerKind {
        ServerKind::Grpc
    }

    fn use_middleware(&mut self, middleware: Vec<Middleware>) {
        self.middleware.extend(middleware);
    }

    fn apply_routes(&mut self, registrar: Registrar) -> Result<(), ServerError> {
        match registrar {
            Registrar::Grpc(register) => {
                register(&mut self.routes);
                Ok(())
            }
            other => Err(ServerError::RegistrarMismatch {
                expected: ServerKind::Grpc,
                got: other.kind(),
            }),
        }
    }

    fn into_router(self: Box<Self>) -> axum::Router {
        self.assemble().into_axum_router()
    }

    async fn run(
        self: Box<Self>,
        app: Arc<Application>,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let listener = super::bind(&app).await?;
        let local = listener.local_addr().ok();
        tracing::info!(app = %app.config().app.name, addr = ?local, "gRPC server listening");

        TonicServer::builder()
            .add_routes(self.assemble())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                cancel.cancelled().await;
                tracing::info!("gRPC server shutting down gracefully (cancellation)");
            })
            .await
            .map_err(|e| ServerError::Serve {
                kind: ServerKind::Grpc,
                source: Box::new(e),
            })
    }
}
