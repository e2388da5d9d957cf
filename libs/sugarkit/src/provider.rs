use async_trait::async_trait;

use crate::container::Application;

/// Service provider: one subsystem with a two-phase initialization.
///
/// `register` runs as soon as the provider is handed to
/// [`Application::register`]; it must be cheap and must not fail (bind an empty
/// manager, nothing more). `boot` runs later, in registration order, and is where
/// connections are opened and the finished service is bound.
#[async_trait]
pub trait ServiceProvider: Send + Sync + 'static {
    /// Human-readable name, used in logs and boot errors.
    fn name(&self) -> &str;

    fn register(&self, app: &Application);

    /// Real initialization. Every provider registered before this one has
    /// already been booted when this runs.
    async fn boot(&self, app: &Application) -> anyhow::Result<()>;
}

/// Lifecycle state of a provider held by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Registered,
    Booted,
}
