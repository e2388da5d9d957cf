#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end assembly through `Bootstrap`.

use anyhow::bail;
use axum::body::Body;
use axum::routing::get;
use http::{Request, StatusCode};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use sugarkit::bootstrap::{
    BootstrapOption, with_grpc_services, with_http_router, with_middleware, with_provider,
    with_service,
};
use sugarkit::server::{ServerError, middleware};
use sugarkit::{
    AppConfig, Application, Bootstrap, BootstrapError, ProviderState, ServerKind,
    ServiceProvider, async_trait, keys,
};
use tower::ServiceExt;

struct Extra {
    fail: bool,
}

#[async_trait]
impl ServiceProvider for Extra {
    fn name(&self) -> &str {
        "extra"
    }

    fn register(&self, _app: &Application) {}

    async fn boot(&self, app: &Application) -> anyhow::Result<()> {
        if self.fail {
            bail!("extra cannot start");
        }
        // Built-ins are booted before any option-registered provider.
        app.make::<sugarkit::services::CacheManager>(keys::CACHE)?;
        app.bind("extra", Arc::new(42_u32));
        Ok(())
    }
}

fn tag(journal: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> middleware::Middleware {
    let journal = Arc::clone(journal);
    middleware::from_fn(move |req, next| {
        let journal = Arc::clone(&journal);
        async move {
            journal.lock().push(name);
            next.run(req).await
        }
    })
}

#[tokio::test]
async fn default_providers_are_booted_in_order() {
    let bootstrap = Bootstrap::new(ServerKind::Http, AppConfig::default(), vec![])
        .await
        .unwrap();

    let states = bootstrap.app().provider_states();
    assert_eq!(
        states,
        [
            ("logger".to_owned(), ProviderState::Booted),
            ("database".to_owned(), ProviderState::Booted),
            ("cache".to_owned(), ProviderState::Booted),
            ("storage".to_owned(), ProviderState::Booted),
            ("queue".to_owned(), ProviderState::Booted),
        ]
    );
    assert!(bootstrap.app().is_booted());
}

#[tokio::test]
async fn options_apply_in_call_order() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let bootstrap = Bootstrap::new(
        ServerKind::Http,
        AppConfig::default(),
        vec![
            with_middleware(vec![tag(&journal, "X")]),
            with_http_router(|r| r.route("/ping", get(|| async { "pong" }))),
            with_middleware(vec![tag(&journal, "Y")]),
        ],
    )
    .await
    .unwrap();

    let (_app, server) = bootstrap.into_parts();
    let res = server
        .into_router()
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(*journal.lock(), ["X", "Y"]);
}

#[tokio::test]
async fn provider_option_is_booted_before_new_returns() {
    let bootstrap = Bootstrap::new(
        ServerKind::Http,
        AppConfig::default(),
        vec![with_provider(Extra { fail: false })],
    )
    .await
    .unwrap();

    assert_eq!(*bootstrap.app().make::<u32>("extra").unwrap(), 42);
    let (name, state) = bootstrap.app().provider_states().pop().unwrap();
    assert_eq!(name, "extra");
    assert_eq!(state, ProviderState::Booted);
}

#[tokio::test]
async fn failing_option_provider_aborts_with_its_name() {
    let err = Bootstrap::new(
        ServerKind::Http,
        AppConfig::default(),
        vec![with_provider(Extra { fail: true })],
    )
    .await
    .unwrap_err();

    match err {
        BootstrapError::Boot(boot) => {
            assert_eq!(boot.provider, "extra");
            assert!(boot.to_string().contains("extra cannot start"));
        }
        other => panic!("expected Boot error, got {other:?}"),
    }
}

#[tokio::test]
async fn service_option_binds_into_the_container() {
    let bootstrap = Bootstrap::new(
        ServerKind::Grpc,
        AppConfig::default(),
        vec![with_service("greeting", Arc::new(String::from("hello")))],
    )
    .await
    .unwrap();

    assert_eq!(*bootstrap.app().make::<String>("greeting").unwrap(), "hello");
    assert_eq!(bootstrap.app().config().app.server, ServerKind::Grpc);
}

#[tokio::test]
async fn router_option_on_grpc_server_is_rejected() {
    let err = Bootstrap::new(
        ServerKind::Grpc,
        AppConfig::default(),
        vec![with_http_router(|r| r)],
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Server(ServerError::RegistrarMismatch {
            expected: ServerKind::Grpc,
            got: ServerKind::Http
        })
    ));
}

#[tokio::test]
async fn grpc_services_option_is_accepted_by_grpc_server() {
    let bootstrap = Bootstrap::new(
        ServerKind::Grpc,
        AppConfig::default(),
        vec![with_grpc_services(|_routes| {})],
    )
    .await
    .unwrap();
    assert_eq!(bootstrap.app().config().app.server, ServerKind::Grpc);
}

#[tokio::test]
async fn websocket_kind_fails_construction() {
    let err = Bootstrap::new(ServerKind::Websocket, AppConfig::default(), vec![])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BootstrapError::Server(ServerError::Unsupported(ServerKind::Websocket))
    ));
}

#[tokio::test]
async fn custom_option_errors_stop_construction() {
    let option = BootstrapOption::new("refuse", |_b| {
        Err(ServerError::Unsupported(ServerKind::Websocket).into())
    });
    assert_eq!(option.name(), "refuse");

    let err = Bootstrap::new(ServerKind::Http, AppConfig::default(), vec![option])
        .await
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Server(_)));
}

#[tokio::test]
async fn from_file_loads_yaml_and_reports_missing_files() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(b"app:\n  name: from-file\n").unwrap();

    let bootstrap = Bootstrap::from_file(ServerKind::Http, file.path(), vec![])
        .await
        .unwrap();
    assert_eq!(bootstrap.app().config().app.name, "from-file");

    let err = Bootstrap::from_file(ServerKind::Http, "/no/such/config.yaml", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Config(_)));
}

#[tokio::test]
async fn run_until_returns_once_cancelled() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut config = AppConfig::default();
    config.app.port = port;

    let bootstrap = Bootstrap::new(ServerKind::Http, config, vec![])
        .await
        .unwrap();
    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();

    tokio::time::timeout(
        std::time::Duration::from_secs(5),
        bootstrap.run_until(cancel),
    )
    .await
    .unwrap()
    .unwrap();
}
