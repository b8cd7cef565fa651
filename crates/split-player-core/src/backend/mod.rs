//! Hosting backends
//!
//! A backend knows how to load its runtime dependency (an embed API script,
//! a native library) and how to build a [`VideoAdapter`] for one video.
//! Backends are registered under an identifier and resolved once, when a
//! player is constructed from its configuration.

#[cfg(feature = "simulated")]
pub mod simulated;

#[cfg(feature = "simulated")]
pub use simulated::{
    LogEntry, SimulatedAdapter, SimulatedBackend, SimulationLog, SIMULATED_BACKEND_ID,
};

use crate::{
    adapter::{AdapterContext, VideoAdapter},
    Error, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// A video hosting backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identifier the backend is registered under
    fn id(&self) -> &str;

    /// Load the backend's runtime dependency.
    ///
    /// Called at most once per registration, however many players and
    /// videos use the backend.
    async fn load(&self) -> Result<()>;

    /// Build the adapter for one video. The player calls `create` on it.
    fn create_adapter(&self, context: AdapterContext) -> Result<Box<dyn VideoAdapter>>;
}

/// A registered backend together with its load-once state
pub struct RegisteredBackend {
    backend: Arc<dyn Backend>,
    loaded: OnceCell<()>,
}

impl RegisteredBackend {
    fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            loaded: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.backend.id()
    }

    /// Whether the dependency load has completed
    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Run the backend's dependency load unless it already completed.
    ///
    /// Concurrent callers wait on the same load. A failed load is not
    /// remembered, so a later call tries again.
    pub async fn ensure_loaded(&self) -> Result<()> {
        self.loaded
            .get_or_try_init(|| async {
                info!(backend = self.id(), "Loading backend dependencies");
                self.backend.load().await
            })
            .await?;
        Ok(())
    }

    pub fn create_adapter(&self, context: AdapterContext) -> Result<Box<dyn VideoAdapter>> {
        self.backend.create_adapter(context)
    }
}

impl std::fmt::Debug for RegisteredBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredBackend")
            .field("id", &self.id())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Static mapping from backend identifier to backend.
///
/// Clones share registrations, including their load-once state, so every
/// player built from clones of one registry loads each backend only once.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<RegisteredBackend>>,
}

impl BackendRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in backends
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "simulated")]
        registry.register(SimulatedBackend::new());
        registry
    }

    /// Register a backend under its own identifier, replacing any previous
    /// registration with that identifier
    pub fn register<B: Backend + 'static>(&mut self, backend: B) -> &mut Self {
        self.register_arc(Arc::new(backend))
    }

    pub fn register_arc(&mut self, backend: Arc<dyn Backend>) -> &mut Self {
        let id = backend.id().to_string();
        debug!(backend = %id, "Backend registered");
        self.backends
            .insert(id, Arc::new(RegisteredBackend::new(backend)));
        self
    }

    /// Look up a backend by identifier
    pub fn resolve(&self, hoster: &str) -> Result<Arc<RegisteredBackend>> {
        self.backends
            .get(hoster)
            .cloned()
            .ok_or_else(|| Error::UnknownBackend {
                hoster: hoster.to_string(),
            })
    }

    pub fn contains(&self, hoster: &str) -> bool {
        self.backends.contains_key(hoster)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
