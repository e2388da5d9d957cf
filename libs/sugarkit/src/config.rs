//! Application configuration.
//!
//! Layering (lowest to highest priority):
//! 1. [`AppConfig::default`]
//! 2. YAML file, if a path is given
//! 3. environment variables prefixed with `APP__`, nested with `__`
//!    (`APP__APP__PORT=9000` sets `app.port`)
//! 4. CLI overrides via [`AppConfig::apply_overrides`]
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it changes.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::server::ServerKind;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "APP__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to load configuration: {0}")]
    Load(#[source] Box<figment::Error>),
}

/// Run mode of the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Debug,
    Release,
    Test,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Debug => "debug",
            Mode::Release => "release",
            Mode::Test => "test",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub logger: LoggerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub server: ServerKind,
    pub host: String,
    pub port: u16,
    pub env: Mode,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "sugar".to_owned(),
            server: ServerKind::Http,
            host: "127.0.0.1".to_owned(),
            port: 8080,
            env: Mode::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive (`info`, `debug`, `sugarkit=trace,info`, ...).
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
    /// Log file path; console only when unset.
    pub filename: Option<PathBuf>,
    pub rotation: LogRotation,
    /// Number of rotated files to keep; unlimited when unset.
    pub max_backup: Option<usize>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
            filename: None,
            rotation: LogRotation::Daily,
            max_backup: None,
        }
    }
}

/// SQL dialect of a named connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    Mysql,
    #[serde(alias = "pgsql", alias = "postgresql")]
    Postgres,
    Sqlite,
}

impl fmt::Display for DbDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DbDriver::Mysql => "mysql",
            DbDriver::Postgres => "postgres",
            DbDriver::Sqlite => "sqlite",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Named connections, opened in this order; the first one opened is the default.
    pub connections: Vec<ConnectionConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub driver: DbDriver,
    /// Full DSN; when set, the discrete fields below are ignored.
    #[serde(default)]
    pub dsn: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name (file path for sqlite). Defaults to the connection name.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Extra query parameters appended to the DSN (`charset`, `sslmode`, ...).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl ConnectionConfig {
    /// Build the connection URL for this entry.
    #[must_use]
    pub fn dsn(&self) -> String {
        if let Some(dsn) = &self.dsn {
            return dsn.clone();
        }

        let database = self.database.as_deref().unwrap_or(&self.name);
        let mut url = match self.driver {
            DbDriver::Sqlite => {
                if database == ":memory:" {
                    "sqlite::memory:".to_owned()
                } else {
                    format!("sqlite://{database}")
                }
            }
            DbDriver::Mysql | DbDriver::Postgres => {
                let scheme = self.driver.to_string();
                let host = self.host.as_deref().unwrap_or("127.0.0.1");
                let port = self.port.unwrap_or(match self.driver {
                    DbDriver::Mysql => 3306,
                    _ => 5432,
                });
                let credentials = match (&self.username, &self.password) {
                    (Some(user), Some(pass)) => format!(
                        "{}:{}@",
                        urlencoding::encode(user),
                        urlencoding::encode(pass)
                    ),
                    (Some(user), None) => format!("{}@", urlencoding::encode(user)),
                    _ => String::new(),
                };
                format!("{scheme}://{credentials}{host}:{port}/{database}")
            }
        };

        if !self.params.is_empty() {
            let query = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 6379,
            password: None,
            db: 0,
        }
    }
}

impl RedisConfig {
    #[must_use]
    pub fn url(&self) -> String {
        match &self.password {
            Some(pass) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(pass),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `memory`, `redis`; anything else is ignored at boot.
    pub driver: String,
    pub redis: RedisConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: "memory".to_owned(),
            redis: RedisConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Disks in order; the first one added is the default.
    pub disks: Vec<DiskConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            disks: vec![DiskConfig {
                name: "local".to_owned(),
                driver: "local".to_owned(),
                root: PathBuf::from("./storage"),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskConfig {
    pub name: String,
    /// `local`; anything else is ignored at boot.
    pub driver: String,
    #[serde(default)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// `memory`, `redis`; anything else is ignored at boot.
    pub driver: String,
    /// Name of the default queue (redis list key).
    pub name: String,
    pub redis: RedisConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            driver: "memory".to_owned(),
            name: "default".to_owned(),
            redis: RedisConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load layered configuration: defaults, then `path` (YAML), then `APP__*` env.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingFile`] if `path` does not point to a file, or
    /// [`ConfigError::Load`] if a layer cannot be parsed into [`AppConfig`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Apply command-line overrides on top of the loaded layers.
    pub fn apply_overrides(&mut self, port: Option<u16>, server: Option<ServerKind>) {
        if let Some(port) = port {
            self.app.port = port;
        }
        if let Some(server) = server {
            self.app.server = server;
        }
    }

    /// `host:port` the server binds to.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}
