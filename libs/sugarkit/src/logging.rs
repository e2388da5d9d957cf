//! Logging initialization.
//!
//! One `tracing` subscriber per process: an `EnvFilter` (from `RUST_LOG`, else the
//! configured level) feeding a console layer and, if a filename is configured, a
//! rolling file layer written through a non-blocking worker.
//!
//! Notes:
//! - Installing is best effort. If the process already has a global subscriber
//!   (tests, embedding hosts) it is kept and [`Logger::is_global`] reports `false`.
//! - The file worker flushes when the [`Logger`] is dropped, so keep it alive
//!   for the life of the process (the container does).

use anyhow::Context;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LogRotation, LoggerConfig};

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// The installed logging pipeline, bound into the container under `"logger"`.
pub struct Logger {
    filter: String,
    format: LogFormat,
    file: Option<PathBuf>,
    global: bool,
    _guard: Mutex<Option<WorkerGuard>>,
}

impl Logger {
    /// Effective filter directive.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }

    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Whether this pipeline became the process-wide subscriber.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.global
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("filter", &self.filter)
            .field("format", &self.format)
            .field("file", &self.file)
            .field("global", &self.global)
            .finish_non_exhaustive()
    }
}

/// Build the subscriber described by `cfg` and try to install it globally.
///
/// # Errors
/// Fails if the level directive does not parse or the log file cannot be created.
pub fn init(cfg: &LoggerConfig) -> anyhow::Result<Logger> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cfg.level)
            .with_context(|| format!("invalid log level '{}'", cfg.level))?,
    };
    let directive = filter.to_string();

    let mut layers: Vec<BoxedLayer> = vec![console_layer(cfg.format)];
    let mut guard = None;
    if let Some(path) = &cfg.filename {
        let (layer, worker) = file_layer(cfg, path)?;
        layers.push(layer);
        guard = Some(worker);
    }

    let global = tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init()
        .is_ok();
    if !global {
        tracing::debug!("Global subscriber already installed; keeping it");
    }

    Ok(Logger {
        filter: directive,
        format: cfg.format,
        file: cfg.filename.clone(),
        global,
        _guard: Mutex::new(guard),
    })
}

fn console_layer(format: LogFormat) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout);
    match format {
        LogFormat::Text => Box::new(layer),
        LogFormat::Json => Box::new(layer.json()),
    }
}

fn file_layer(cfg: &LoggerConfig, path: &Path) -> anyhow::Result<(BoxedLayer, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("app");
    let mut builder = rolling::Builder::new()
        .rotation(rotation(cfg.rotation))
        .filename_prefix(prefix);
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        builder = builder.filename_suffix(ext);
    }
    if let Some(keep) = cfg.max_backup.filter(|n| *n > 0) {
        builder = builder.max_log_files(keep);
    }
    let appender = builder
        .build(dir)
        .with_context(|| format!("open log file {}", path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer);
    let layer: BoxedLayer = match cfg.format {
        LogFormat::Text => Box::new(layer),
        LogFormat::Json => Box::new(layer.json()),
    };
    Ok((layer, guard))
}

fn rotation(r: LogRotation) -> Rotation {
    match r {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_is_rejected() {
        let cfg = LoggerConfig {
            level: "info,sugarkit[".to_owned(),
            ..LoggerConfig::default()
        };
        let err = temp_env::with_var_unset("RUST_LOG", || init(&cfg)).unwrap_err();
        assert!(err.to_string().contains("invalid log level"), "{err:#}");
    }

    #[test]
    fn file_layer_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LoggerConfig {
            filename: Some(dir.path().join("nested/app.log")),
            rotation: LogRotation::Never,
            ..LoggerConfig::default()
        };

        let logger = temp_env::with_var_unset("RUST_LOG", || init(&cfg)).unwrap();
        assert!(dir.path().join("nested").is_dir());
        assert_eq!(logger.file(), Some(dir.path().join("nested/app.log").as_path()));
        assert_eq!(logger.format(), LogFormat::Text);
    }
}
