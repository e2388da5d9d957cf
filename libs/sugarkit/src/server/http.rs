//! HTTP server variant backed by axum.

use async_trait::async_trait;
use axum::Router;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::middleware::{self, Middleware};
use super::{Registrar, Server, ServerError, ServerKind};
use crate::container::Application;

#[derive(Default)]
pub struct HttpServer {
    router: Router,
    middleware: Vec<Middleware>,
}

impl HttpServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn assemble(self) -> Router {
        middleware::apply(self.router, &self.middleware)
    }
}

#[async_trait]
impl Server for HttpServer {
    fn kind(&self) -> ServerKind {
        ServerKind::Http
    }

    fn use_middleware(&mut self, middleware: Vec<Middleware>) {
        self.middleware.extend(middleware);
    }

    fn apply_routes(&mut self, registrar: Registrar) -> Result<(), ServerError> {
        match registrar {
            Registrar::Http(register) => {
                let router = std::mem::take(&mut self.router);
                self.router = register(router);
                Ok(())
            }
            other => Err(ServerError::RegistrarMismatch {
                expected: ServerKind::Http,
                got: other.kind(),
            }),
        }
    }

    fn into_router(self: Box<Self>) -> Router {
        self.assemble()
    }

    async fn run(
        self: Box<Self>,
        app: Arc<Application>,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        let listener = super::bind(&app).await?;
        let local = listener.local_addr().ok();
        tracing::info!(app = %app.config().app.name, addr = ?local, "HTTP server listening");

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, self.assemble())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve {
                kind: ServerKind::Http,
                source: Box::new(e),
            })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn routes_are_served_through_the_router() {
        let mut server = HttpServer::new();
        server
            .apply_routes(Registrar::http(|r| r.route("/ping", get(|| async { "pong" }))))
            .unwrap();

        let router = Box::new(server).into_router();
        let res = router
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn grpc_registrar_is_rejected() {
        let mut server = HttpServer::new();
        let err = server.apply_routes(Registrar::grpc(|_| {})).unwrap_err();
        assert!(matches!(
            err,
            ServerError::RegistrarMismatch {
                expected: ServerKind::Http,
                got: ServerKind::Grpc
            }
        ));
    }
}
