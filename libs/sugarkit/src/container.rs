//! Application container.
//!
//! The container owns two things:
//! - a service map: string key -> `Arc<T>`, type-checked on read;
//! - the ordered list of registered [`ServiceProvider`]s, which drives boot order.
//!
//! Implementation details:
//! - Values are stored as `Box<dyn Any + Send + Sync>` holding exactly `Arc<T>`, so `T`
//!   may be a trait object (`dyn CacheStore`). The concrete type name is recorded at
//!   bind time to report mismatches.
//! - The service map sits behind a `RwLock`: request handlers read concurrently, late
//!   binds take the write side.
//! - Boot is serialized by an async gate; the provider list lock is never held
//!   across a provider's `boot().await`.
//!
//! Notes:
//! - Rebinding a key overwrites it; `Arc`s already handed out stay valid.
//! - `must_make` is for the bootstrap sequence only, where a missing dependency is a
//!   programming error.

use parking_lot::{Mutex, RwLock};
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::config::AppConfig;
use crate::error::{BootError, ContainerError};
use crate::provider::{ProviderState, ServiceProvider};
use crate::providers::keys;

struct ServiceEntry {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

struct ProviderEntry {
    provider: Arc<dyn ServiceProvider>,
    state: ProviderState,
}

/// Process-wide registry of services and providers.
pub struct Application {
    config: Arc<AppConfig>,
    services: RwLock<HashMap<String, ServiceEntry>>,
    providers: Mutex<Vec<ProviderEntry>>,
    booted: AtomicBool,
    boot_gate: tokio::sync::Mutex<()>,
}

impl Application {
    /// Create a container; the configuration is bound under [`keys::CONFIG`].
    #[must_use]
    pub fn new(config: Arc<AppConfig>) -> Self {
        let app = Self {
            config,
            services: RwLock::new(HashMap::new()),
            providers: Mutex::new(Vec::new()),
            booted: AtomicBool::new(false),
            boot_gate: tokio::sync::Mutex::new(()),
        };
        app.bind::<AppConfig>(keys::CONFIG, Arc::clone(&app.config));
        app
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    /// Append a provider and run its `register` step immediately.
    pub fn register<P: ServiceProvider>(&self, provider: P) {
        self.register_arc(Arc::new(provider));
    }

    /// Same as [`Application::register`] for an already shared provider.
    pub fn register_arc(&self, provider: Arc<dyn ServiceProvider>) {
        tracing::debug!(provider = provider.name(), "Registering provider");
        self.providers.lock().push(ProviderEntry {
            provider: Arc::clone(&provider),
            state: ProviderState::Registered,
        });
        provider.register(self);
    }

    /// Boot every registered provider in registration order.
    ///
    /// Idempotent: once the container is booted this returns `Ok(())` without
    /// touching any provider.
    ///
    /// # Errors
    /// Returns [`BootError`] naming the first provider whose boot failed. Providers
    /// after it are left unbooted and nothing already bound is rolled back.
    pub async fn boot(&self) -> Result<(), BootError> {
        let _gate = self.boot_gate.lock().await;
        if self.booted.load(Ordering::Acquire) {
            return Ok(());
        }

        tracing::info!("Phase: boot");
        self.boot_registered().await?;
        self.booted.store(true, Ordering::Release);
        Ok(())
    }

    /// Boot providers that were registered but not booted yet, e.g. ones added
    /// after [`Application::boot`] already completed.
    ///
    /// # Errors
    /// Same contract as [`Application::boot`].
    pub async fn boot_pending(&self) -> Result<(), BootError> {
        let _gate = self.boot_gate.lock().await;
        self.boot_registered().await
    }

    async fn boot_registered(&self) -> Result<(), BootError> {
        loop {
            let next = {
                let providers = self.providers.lock();
                providers
                    .iter()
                    .position(|e| e.state == ProviderState::Registered)
                    .map(|idx| (idx, Arc::clone(&providers[idx].provider)))
            };
            let Some((idx, provider)) = next else {
                return Ok(());
            };

            tracing::info!(provider = provider.name(), "Booting provider");
            provider.boot(self).await.map_err(|source| {
                tracing::error!(provider = provider.name(), error = %source, "Provider boot failed");
                BootError {
                    provider: provider.name().to_owned(),
                    source,
                }
            })?;

            self.providers.lock()[idx].state = ProviderState::Booted;
        }
    }

    #[inline]
    #[must_use]
    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::Acquire)
    }

    /// Snapshot of `(name, state)` for every provider, in registration order.
    #[must_use]
    pub fn provider_states(&self) -> Vec<(String, ProviderState)> {
        self.providers
            .lock()
            .iter()
            .map(|e| (e.provider.name().to_owned(), e.state))
            .collect()
    }

    /// Store `service` under `key`, replacing whatever was there.
    pub fn bind<T>(&self, key: impl Into<String>, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = ServiceEntry {
            value: Box::new(service),
            type_name: std::any::type_name::<T>(),
        };
        self.services.write().insert(key.into(), entry);
    }

    /// Resolve the service under `key` as `T`.
    ///
    /// # Errors
    /// - [`ContainerError::NotFound`] if nothing is bound under `key`;
    /// - [`ContainerError::TypeMismatch`] if the bound value is not an `Arc<T>`.
    pub fn make<T>(&self, key: &str) -> Result<Arc<T>, ContainerError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let services = self.services.read();
        let entry = services.get(key).ok_or_else(|| ContainerError::NotFound {
            key: key.to_owned(),
        })?;

        entry
            .value
            .downcast_ref::<Arc<T>>()
            .map(Arc::clone)
            .ok_or_else(|| ContainerError::TypeMismatch {
                key: key.to_owned(),
                expected: std::any::type_name::<T>(),
                actual: entry.type_name,
            })
    }

    /// Resolve a service that must exist. Bootstrap-time use only.
    ///
    /// # Panics
    /// Panics if the key is unbound or bound to a different type.
    #[must_use]
    pub fn must_make<T>(&self, key: &str) -> Arc<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.make::<T>(key) {
            Ok(service) => service,
            Err(e) => panic!("{e}"),
        }
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.services.read().contains_key(key)
    }

    /// Bound keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.services.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new(Arc::new(AppConfig::default()))
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("app", &self.config.app.name)
            .field("services", &self.keys())
            .field("providers", &self.provider_states())
            .field("booted", &self.is_booted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_owned()
        }
    }

    #[test]
    fn bind_then_make_returns_the_same_instance() {
        let app = Application::default();
        let svc = Arc::new(String::from("db-handle"));
        app.bind("handle", Arc::clone(&svc));

        let got = app.make::<String>("handle").unwrap();
        assert!(Arc::ptr_eq(&svc, &got));
    }

    #[test]
    fn make_unbound_key_is_not_found() {
        let app = Application::default();

        match app.make::<String>("missing") {
            Err(ContainerError::NotFound { key }) => assert_eq!(key, "missing"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn make_with_wrong_type_is_type_mismatch() {
        let app = Application::default();
        app.bind("port", Arc::new(8080_u16));

        let err = app.make::<String>("port").unwrap_err();
        match err {
            ContainerError::TypeMismatch {
                key,
                expected,
                actual,
            } => {
                assert_eq!(key, "port");
                assert!(expected.contains("String"));
                assert_eq!(actual, "u16");
            }
            ContainerError::NotFound { .. } => panic!("expected TypeMismatch"),
        }
    }

    #[test]
    fn rebinding_overwrites_but_keeps_old_arcs_alive() {
        let app = Application::default();
        app.bind("name", Arc::new(String::from("first")));
        let first = app.make::<String>("name").unwrap();

        app.bind("name", Arc::new(String::from("second")));
        let second = app.make::<String>("name").unwrap();

        assert_eq!(first.as_str(), "first");
        assert_eq!(second.as_str(), "second");
    }

    #[test]
    fn trait_objects_can_be_bound_and_resolved() {
        let app = Application::default();
        app.bind::<dyn Greeter>("greeter", Arc::new(English));

        let greeter = app.make::<dyn Greeter>("greeter").unwrap();
        assert_eq!(greeter.greet(), "hello");

        // Same key, concrete type requested: the stored value is Arc<dyn Greeter>.
        assert!(matches!(
            app.make::<English>("greeter"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn config_is_bound_on_construction() {
        let app = Application::default();
        let cfg = app.make::<AppConfig>(keys::CONFIG).unwrap();
        assert!(Arc::ptr_eq(&cfg, app.config()));
        assert!(app.has(keys::CONFIG));
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn must_make_panics_on_missing_service() {
        let app = Application::default();
        let _ = app.must_make::<String>("nope");
    }

    #[test]
    #[should_panic(expected = "type mismatch")]
    fn must_make_panics_on_mismatch() {
        let app = Application::default();
        app.bind("n", Arc::new(1_i32));
        let _ = app.must_make::<String>("n");
    }

    #[tokio::test]
    async fn concurrent_binds_and_reads_are_consistent() {
        let app = Arc::new(Application::default());
        app.bind("counter", Arc::new(0_usize));

        let mut handles = Vec::new();
        for i in 0..16_usize {
            let app = Arc::clone(&app);
            handles.push(tokio::spawn(async move {
                app.bind(format!("svc-{i}"), Arc::new(i));
                app.make::<usize>("counter").is_ok()
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        for i in 0..16_usize {
            assert_eq!(*app.make::<usize>(&format!("svc-{i}")).unwrap(), i);
        }
    }
}
