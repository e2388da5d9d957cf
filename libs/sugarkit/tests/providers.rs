#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Built-in providers wired against a real container.

use anyhow::bail;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use sugarkit::config::{
    AppConfig, ConnectionConfig, DbDriver, DiskConfig, PoolConfig, StorageConfig,
};
use sugarkit::providers::{
    self, CacheServiceProvider, DatabaseServiceProvider, QueueServiceProvider,
    StorageServiceProvider, keys,
};
use sugarkit::services::{DbConnection, DbConnector, ManagerError, SqlxConnector};
use sugarkit::{Application, async_trait};

fn connection(name: &str) -> ConnectionConfig {
    ConnectionConfig {
        name: name.to_owned(),
        driver: DbDriver::Sqlite,
        dsn: None,
        host: None,
        port: None,
        database: Some(":memory:".to_owned()),
        username: None,
        password: None,
        params: BTreeMap::new(),
        pool: PoolConfig {
            max_connections: Some(1),
            ..PoolConfig::default()
        },
    }
}

/// Opens in-memory sqlite pools, refusing any connection listed in `refuse`.
struct FakeConnector {
    refuse: Vec<&'static str>,
    attempts: Mutex<Vec<String>>,
}

#[async_trait]
impl DbConnector for FakeConnector {
    async fn connect(&self, cfg: &ConnectionConfig) -> anyhow::Result<DbConnection> {
        self.attempts.lock().push(cfg.name.clone());
        if self.refuse.iter().any(|r| *r == cfg.name) {
            bail!("failed to connect {} {}: connection refused", cfg.driver, cfg.name);
        }
        SqlxConnector.connect(cfg).await
    }
}

fn app_with(config: AppConfig) -> (Arc<AppConfig>, Application) {
    let config = Arc::new(config);
    let app = Application::new(Arc::clone(&config));
    (config, app)
}

#[tokio::test]
async fn database_register_binds_an_empty_manager() {
    let (config, app) = app_with(AppConfig::default());
    app.register(DatabaseServiceProvider::new(config));

    let db = providers::database::manager(&app).unwrap();
    assert!(db.is_empty());
    assert!(matches!(
        db.default_item(),
        Err(ManagerError::NoDefault { .. })
    ));
}

#[tokio::test]
async fn database_first_connection_becomes_default() {
    let mut config = AppConfig::default();
    config.database.connections = vec![connection("main"), connection("reports")];
    let (config, app) = app_with(config);

    let connector = Arc::new(FakeConnector {
        refuse: vec![],
        attempts: Mutex::new(Vec::new()),
    });
    app.register(DatabaseServiceProvider::with_connector(config, connector));
    app.boot().await.unwrap();

    let db = providers::database::manager(&app).unwrap();
    assert_eq!(db.names(), ["main", "reports"]);
    assert_eq!(db.default_item().unwrap().name(), "main");
    db.get("reports").unwrap().ping().await.unwrap();
}

#[tokio::test]
async fn database_boot_fails_fast_and_names_the_connection() {
    let mut config = AppConfig::default();
    config.database.connections = vec![
        connection("main"),
        connection("broken"),
        connection("late"),
    ];
    let (config, app) = app_with(config);

    let connector = Arc::new(FakeConnector {
        refuse: vec!["broken"],
        attempts: Mutex::new(Vec::new()),
    });
    app.register(DatabaseServiceProvider::with_connector(
        config,
        Arc::clone(&connector) as Arc<dyn DbConnector>,
    ));

    let err = app.boot().await.unwrap_err();
    assert_eq!(err.provider, "database");
    assert!(err.to_string().contains("sqlite broken"), "{err}");

    // "late" was never attempted; "main" stays registered.
    assert_eq!(*connector.attempts.lock(), ["main", "broken"]);
    let db = providers::database::manager(&app).unwrap();
    assert_eq!(db.names(), ["main"]);
    assert_eq!(db.default_item().unwrap().name(), "main");
}

#[tokio::test]
async fn cache_memory_driver_is_the_default_store() {
    let (config, app) = app_with(AppConfig::default());
    app.register(CacheServiceProvider::new(config));
    app.boot().await.unwrap();

    let cache = providers::cache::manager(&app).unwrap();
    let store = cache.default_item().unwrap();
    store.set("greeting", "hi", None).await.unwrap();
    assert_eq!(store.get("greeting").await.unwrap().as_deref(), Some("hi"));
    assert_eq!(cache.default_name().as_deref(), Some("default"));
}

#[tokio::test]
async fn unknown_cache_and_queue_drivers_are_skipped() {
    let mut config = AppConfig::default();
    config.cache.driver = "memcached".to_owned();
    config.queue.driver = "sqs".to_owned();
    let (config, app) = app_with(config);
    app.register(CacheServiceProvider::new(Arc::clone(&config)));
    app.register(QueueServiceProvider::new(config));

    app.boot().await.unwrap();

    assert!(providers::cache::manager(&app).unwrap().is_empty());
    assert!(providers::queue::manager(&app).unwrap().is_empty());
}

#[tokio::test]
async fn storage_adds_local_disks_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.storage = StorageConfig {
        disks: vec![
            DiskConfig {
                name: "uploads".to_owned(),
                driver: "local".to_owned(),
                root: dir.path().join("uploads"),
            },
            DiskConfig {
                name: "s3".to_owned(),
                driver: "s3".to_owned(),
                root: PathBuf::new(),
            },
            DiskConfig {
                name: "backups".to_owned(),
                driver: "local".to_owned(),
                root: dir.path().join("backups"),
            },
        ],
    };
    let (config, app) = app_with(config);
    app.register(StorageServiceProvider::new(config));
    app.boot().await.unwrap();

    let storage = providers::storage::manager(&app).unwrap();
    assert_eq!(storage.names(), ["backups", "uploads"]);
    assert_eq!(storage.default_name().as_deref(), Some("uploads"));

    let disk = storage.default_item().unwrap();
    disk.put("a/b.txt", b"data").await.unwrap();
    assert!(dir.path().join("uploads/a/b.txt").is_file());
}

#[tokio::test]
async fn queue_memory_driver_uses_the_configured_name() {
    let mut config = AppConfig::default();
    config.queue.name = "mail".to_owned();
    let (config, app) = app_with(config);
    app.register(QueueServiceProvider::new(config));
    app.boot().await.unwrap();

    let queues = providers::queue::manager(&app).unwrap();
    let mail = queues.get("mail").unwrap();
    mail.push(serde_json::json!({"to": "ops@example.com"}))
        .await
        .unwrap();
    assert_eq!(mail.size().await.unwrap(), 1);
}

#[tokio::test]
async fn default_provider_set_binds_every_key() {
    let (config, app) = app_with(AppConfig::default());
    for provider in providers::defaults(&config) {
        app.register_arc(provider);
    }
    app.boot().await.unwrap();

    for key in [
        keys::CONFIG,
        keys::LOGGER,
        keys::DB,
        keys::CACHE,
        keys::STORAGE,
        keys::QUEUE,
    ] {
        assert!(app.has(key), "missing {key}");
    }
    let names: Vec<_> = app.provider_states().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["logger", "database", "cache", "storage", "queue"]);
}
