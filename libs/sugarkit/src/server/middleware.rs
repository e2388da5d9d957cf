//! Transport-neutral request middleware.
//!
//! A [`Middleware`] is an async function of the request and the rest of the
//! chain. Both server variants run the chain through an axum router, so the same
//! middleware wraps HTTP handlers and gRPC services.

use axum::Router;
use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use futures::future::BoxFuture;
use http::{HeaderValue, Method, StatusCode, header};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

pub type Middleware = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async function as [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req, next| Box::pin(f(req, next)))
}

/// Layer `chain` onto `router` so that `chain[0]` is the outermost.
pub(crate) fn apply(router: Router, chain: &[Middleware]) -> Router {
    // axum wraps each new layer around the previous ones.
    chain.iter().rev().fold(router, |router, mw| {
        let mw = Arc::clone(mw);
        router.layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            let mw = Arc::clone(&mw);
            async move { mw(req, next).await }
        }))
    })
}

/// Convert a panic in any inner handler into a `500` response.
#[must_use]
pub fn recovery() -> Middleware {
    from_fn(|req, next| async move {
        let method = req.method().clone();
        let uri = req.uri().clone();
        match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                tracing::error!(
                    %method,
                    %uri,
                    panic = panic_message(&*panic),
                    "Recovered from handler panic"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// One log line per request; `error` for 5xx, `warn` for 4xx, `debug` otherwise.
#[must_use]
pub fn access_log() -> Middleware {
    from_fn(|req, next| async move {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let start = Instant::now();

        let response = next.run(req).await;

        let status = response.status().as_u16();
        let elapsed = start.elapsed();
        if response.status().is_server_error() {
            tracing::error!(%method, %uri, status, ?elapsed, "HTTP error");
        } else if response.status().is_client_error() {
            tracing::warn!(%method, %uri, status, ?elapsed, "HTTP warning");
        } else {
            tracing::debug!(%method, %uri, status, ?elapsed, "HTTP access");
        }
        response
    })
}

const ALLOW_METHODS: &str = "POST, GET, OPTIONS, PUT, PATCH, DELETE";
const ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Authorization";
const EXPOSE_HEADERS: &str = "Content-Length, Access-Control-Allow-Origin, \
    Access-Control-Allow-Headers, Cache-Control, Content-Language, Content-Type";

/// CORS headers for requests carrying an allowed `Origin`; `OPTIONS` is answered
/// with `204` without reaching the handler.
///
/// An empty `allowed_origins` (or one containing `"*"`) allows any origin. The
/// request origin is echoed back, never `*`, since credentials are allowed.
#[must_use]
pub fn cors<I, S>(allowed_origins: I) -> Middleware
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: Arc<Vec<String>> =
        Arc::new(allowed_origins.into_iter().map(Into::into).collect());
    from_fn(move |req, next| {
        let allowed = Arc::clone(&allowed);
        async move {
            let origin = req
                .headers()
                .get(header::ORIGIN)
                .filter(|o| {
                    o.to_str().is_ok_and(|o| {
                        allowed.is_empty() || allowed.iter().any(|a| a == "*" || a == o)
                    })
                })
                .cloned();

            let mut response = if req.method() == Method::OPTIONS {
                StatusCode::NO_CONTENT.into_response()
            } else {
                next.run(req).await
            };

            if let Some(origin) = origin {
                let headers = response.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(ALLOW_METHODS),
                );
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOW_HEADERS),
                );
                headers.insert(
                    header::ACCESS_CONTROL_EXPOSE_HEADERS,
                    HeaderValue::from_static(EXPOSE_HEADERS),
                );
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
                headers.append(header::VARY, HeaderValue::from_static("Origin"));
            }
            response
        }
    })
}

/// The chain installed by default: recovery, access log, permissive CORS.
#[must_use]
pub fn defaults() -> Vec<Middleware> {
    vec![recovery(), access_log(), cors(Vec::<String>::new())]
}
