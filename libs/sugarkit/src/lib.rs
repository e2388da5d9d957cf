#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `Sugarkit`: application bootstrap runtime.
//!
//! A process-wide [`Application`] container holds typed services and drives
//! [`ServiceProvider`]s through two phases (register, then boot). A
//! [`Bootstrap`] wires the default providers, picks one network server (HTTP via
//! axum, gRPC via tonic) and runs it.
//!
//! # Example
//! ```rust,no_run
//! use axum::routing::get;
//! use sugarkit::{AppConfig, Bootstrap, ServerKind, bootstrap, server::middleware};
//!
//! # async fn demo() -> Result<(), sugarkit::BootstrapError> {
//! let app = Bootstrap::new(
//!     ServerKind::Http,
//!     AppConfig::default(),
//!     vec![
//!         bootstrap::with_middleware(middleware::defaults()),
//!         bootstrap::with_http_router(|r| r.route("/ping", get(|| async { "pong" }))),
//!     ],
//! )
//! .await?;
//! app.run().await
//! # }
//! ```
//!
//! # Features
//! - `redis` (default): redis drivers for the cache and queue providers

pub mod bootstrap;
pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod provider;
pub mod providers;
pub mod server;
pub mod services;
pub mod shutdown;

pub use bootstrap::{Bootstrap, BootstrapOption};
pub use config::{AppConfig, ConfigError, Mode};
pub use container::Application;
pub use error::{BootError, BootstrapError, ContainerError};
pub use provider::{ProviderState, ServiceProvider};
pub use providers::keys;
pub use server::{Registrar, Server, ServerError, ServerKind};

// Re-exported so callers can implement providers without a direct dependency.
pub use async_trait::async_trait;
