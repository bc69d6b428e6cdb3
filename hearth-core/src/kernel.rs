//! # The Core — lifecycle and service registry
//!
//! Owns the configuration tree, the provider list, the service registry
//! and the event bus, and drives providers through their phases.
//!
//! # Lifecycle
//! ```text
//!  register(..)      boot()             start()             destroy()
//!  ────────────>  NEW ──────> BOOTED ──────────> STARTED ─────────> DESTROYED
//!                    early providers    normal providers     (from any state)
//! ```
//!
//! # Examples
//! ```rust
//! use hearth_core::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! #[async_trait::async_trait]
//! impl Provider for Clock {
//!     fn provides(&self) -> Vec<String> {
//!         vec!["clock".into()]
//!     }
//! }
//!
//! let core = Core::builder("desktop")
//!     .defaults(json!({"locale": "en_EN"}))
//!     .configuration(json!({"locale": "nb_NO"}))
//!     .build();
//!
//! core.register(|_core, _args| Ok(Clock), RegisterOptions::early());
//! core.singleton("greeting", |_| Ok(String::from("hello")));
//!
//! assert_eq!(core.config_or("locale", "none"), json!("nb_NO"));
//! let greeting: Arc<String> = core.make("greeting", &[]).expect("registered above");
//! assert_eq!(greeting.as_str(), "hello");
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_support::rendering::shorten_type_name;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use crate::config::Configuration;
use crate::error::{CoreError, ProviderError, Result};
use crate::events::{EventBus, HandlerId};
use crate::lifecycle::{self, CoreState, EVENT_BOOTED, EVENT_DESTROYED, EVENT_STARTED};
use crate::lifetime::Lifetime;
use crate::logger::{Logger, TracingLogger};
use crate::provider::{Phase, Provider, ProviderEntry, ProviderList, RegisterOptions};
use crate::registry::{ServiceRegistry, SharedValue};

// ═══════════════════════════════════════════
// CoreBuilder
// ═══════════════════════════════════════════

/// Builds a [`Core`].
///
/// ```rust,ignore
/// let core = Core::builder("server")
///     .defaults(default_config())
///     .configuration(user_config)
///     .logger(RecordingLogger::new())
///     .build();
/// ```
pub struct CoreBuilder {
    name: String,
    defaults: Value,
    configuration: Value,
    options: Value,
    logger: Option<Arc<dyn Logger>>,
}

impl CoreBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            defaults: Value::Object(Default::default()),
            configuration: Value::Object(Default::default()),
            options: Value::Object(Default::default()),
            logger: None,
        }
    }

    /// The default configuration tree.
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = defaults;
        self
    }

    /// Configuration merged over the defaults.
    pub fn configuration(mut self, configuration: Value) -> Self {
        self.configuration = configuration;
        self
    }

    /// Free-form options kept alongside the configuration.
    pub fn options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Replaces the default [`TracingLogger`].
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Merges the configuration and creates the core.
    pub fn build(self) -> Core {
        let configuration = Configuration::merged(self.defaults, self.configuration);
        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger::new(self.name.clone())) as Arc<dyn Logger>);

        info!(core = %self.name, "Core created");
        Core {
            inner: Arc::new(CoreInner {
                events: EventBus::new(self.name.clone()),
                name: self.name,
                configuration,
                options: self.options,
                logger,
                providers: Mutex::new(ProviderList::new()),
                services: ServiceRegistry::new(),
                booted: AtomicBool::new(false),
                started: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
            }),
        }
    }
}

// ═══════════════════════════════════════════
// Core
// ═══════════════════════════════════════════

struct CoreInner {
    name: String,
    configuration: Configuration,
    options: Value,
    logger: Arc<dyn Logger>,
    providers: Mutex<ProviderList>,
    services: ServiceRegistry,
    events: EventBus,
    booted: AtomicBool,
    started: AtomicBool,
    destroyed: AtomicBool,
}

/// Provider lifecycle and service registry.
///
/// `Core` is a handle: clones share the same state. Providers usually keep
/// a clone so they can register services and read configuration; that
/// clone forms a cycle with the provider list which `destroy()` breaks.
#[derive(Clone)]
pub struct Core {
    inner: Arc<CoreInner>,
}

impl Core {
    /// Create a new builder.
    pub fn builder(name: impl Into<String>) -> CoreBuilder {
        CoreBuilder::new(name.into())
    }

    /// Creates a core from default and supplied configuration trees.
    pub fn new(name: impl Into<String>, defaults: Value, configuration: Value, options: Value) -> Self {
        Self::builder(name)
            .defaults(defaults)
            .configuration(configuration)
            .options(options)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn options(&self) -> &Value {
        &self.inner.options
    }

    pub fn logger(&self) -> &dyn Logger {
        self.inner.logger.as_ref()
    }

    // ── Configuration ──

    /// Looks up a dotted configuration key; `""` returns the whole tree.
    ///
    /// ```rust,ignore
    /// let port = core.config("http.port");
    /// ```
    pub fn config(&self, key: &str) -> Option<Value> {
        self.inner.configuration.get(key)
    }

    /// Looks up a dotted configuration key, falling back to `default`.
    pub fn config_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.inner.configuration.get_or(key, default)
    }

    /// Looks up a dotted configuration key and deserializes it.
    pub fn config_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.inner.configuration.get_as(key)
    }

    // ── Providers ──

    /// Constructs a provider and adds it to the provider list.
    ///
    /// `constructor` receives this core and `options.args`. If it fails the
    /// error is logged and nothing is added. A destroyed core ignores the
    /// call without running `constructor`.
    pub fn register<P, F>(&self, constructor: F, options: RegisterOptions)
    where
        P: Provider + 'static,
        F: FnOnce(&Core, Option<Value>) -> std::result::Result<P, ProviderError>,
    {
        if self.is_destroyed() {
            self.inner.logger.warn(&format!(
                "Core::register() {}: core is destroyed",
                shorten_type_name(std::any::type_name::<P>())
            ));
            return;
        }

        match constructor(self, options.args.clone()) {
            Ok(provider) => {
                let entry = ProviderEntry {
                    options,
                    provider: Arc::new(provider),
                };
                debug!(
                    provider = %entry.display_name(),
                    phase = %entry.options.phase(),
                    "Registered provider"
                );
                self.inner.providers.lock().push(entry);
            }
            Err(e) => {
                self.inner.logger.error(&format!(
                    "Core::register() {}: {e}",
                    shorten_type_name(std::any::type_name::<P>())
                ));
            }
        }
    }

    /// Number of registered providers.
    pub fn provider_count(&self) -> usize {
        self.inner.providers.lock().len()
    }

    /// Registered provider names in registration order.
    pub fn providers(&self) -> Vec<String> {
        self.inner
            .providers
            .lock()
            .all()
            .iter()
            .map(ProviderEntry::display_name)
            .collect()
    }

    // ── Services ──

    /// Registers a factory that runs on every `make()`.
    pub fn instance<T, F>(&self, name: impl Into<String>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&[Value]) -> std::result::Result<T, ProviderError> + Send + Sync + 'static,
    {
        self.inner.services.register(name, Lifetime::Instance, factory);
    }

    /// Registers a factory whose first result is cached.
    pub fn singleton<T, F>(&self, name: impl Into<String>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&[Value]) -> std::result::Result<T, ProviderError> + Send + Sync + 'static,
    {
        self.inner.services.register(name, Lifetime::Singleton, factory);
    }

    /// Makes a service by name.
    ///
    /// ```rust,ignore
    /// let vfs: Arc<Vfs> = core.make("osjs/vfs", &[])?;
    /// ```
    pub fn make<T: Send + Sync + 'static>(&self, name: &str, args: &[Value]) -> Result<Arc<T>> {
        self.inner.services.make(name, args)
    }

    /// Makes a service by name without downcasting it.
    pub fn make_any(&self, name: &str, args: &[Value]) -> Result<SharedValue> {
        self.inner.services.make_any(name, args)
    }

    /// Returns `true` if a service is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.inner.services.has(name)
    }

    /// Registered service names in registration order.
    pub fn services(&self) -> Vec<String> {
        self.inner.services.names()
    }

    // ── Lifecycle ──

    /// Loads the early providers. Runs once; later calls, and calls on a
    /// destroyed core, return at once.
    pub async fn boot(&self) {
        if self.is_destroyed() {
            self.inner.logger.warn("Core::boot() on a destroyed core");
            return;
        }
        if self.inner.booted.swap(true, Ordering::SeqCst) {
            trace!(core = %self.inner.name, "Already booted");
            return;
        }

        let ok = self.load(Phase::Early).await;
        self.emit(EVENT_BOOTED, &Value::Bool(ok));
    }

    /// Loads the normal providers.
    ///
    /// Returns `None` if the core was already started or destroyed,
    /// otherwise whether the phase completed. Does not require `boot()` to
    /// have run.
    pub async fn start(&self) -> Option<bool> {
        if self.is_destroyed() {
            self.inner.logger.warn("Core::start() on a destroyed core");
            return None;
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            trace!(core = %self.inner.name, "Already started");
            return None;
        }

        let ok = self.load(Phase::Normal).await;
        self.emit(EVENT_STARTED, &Value::Bool(ok));
        Some(ok)
    }

    async fn load(&self, phase: Phase) -> bool {
        // Providers registered while the phase runs are not part of it.
        let entries = self.inner.providers.lock().in_phase(phase);
        lifecycle::load_providers(entries, phase, self.inner.logger.as_ref()).await
    }

    /// Destroys every provider and drops cached singletons.
    ///
    /// Returns `Ok(false)` if the core was already destroyed. Service
    /// registrations survive, so `has()` keeps answering and `make()`
    /// builds singletons afresh. Destroyed is terminal: `register()`,
    /// `boot()` and `start()` are ignored afterwards.
    ///
    /// # Errors
    /// [`CoreError::TeardownFailed`] if a provider's `destroy()` fails.
    /// Providers after it are not destroyed and nothing is cleared.
    #[instrument(skip(self), fields(core = %self.inner.name))]
    pub fn destroy(&self) -> Result<bool> {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        let entries = self.inner.providers.lock().all();
        for entry in &entries {
            debug!(provider = %entry.display_name(), "Destroying provider");
            entry
                .provider
                .destroy()
                .map_err(|source| CoreError::TeardownFailed {
                    provider: entry.display_name(),
                    source,
                })?;
        }

        self.inner.providers.lock().clear();
        self.inner.services.clear_instances();

        info!("Core destroyed");
        self.emit(EVENT_DESTROYED, &Value::Null);
        Ok(true)
    }

    fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> CoreState {
        CoreState::from_flags(
            self.inner.booted.load(Ordering::SeqCst),
            self.inner.started.load(Ordering::SeqCst),
            self.inner.destroyed.load(Ordering::SeqCst),
        )
    }

    // ── Events ──

    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.events.on(event, handler)
    }

    pub fn once<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.events.once(event, handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.inner.events.off(event, id)
    }

    /// Delivers `payload` to the handlers of `event`; returns how many ran.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        self.inner.events.emit(event, payload)
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .field("providers", &self.provider_count())
            .field("services", &self.inner.services.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Core, CoreBuilder};
    pub use crate::error::{CoreError, ProviderError};
    pub use crate::lifecycle::CoreState;
    pub use crate::logger::{Logger, RecordingLogger, TracingLogger};
    pub use crate::provider::{Provider, RegisterOptions};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
