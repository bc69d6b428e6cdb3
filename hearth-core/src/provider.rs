//! Provider trait — a pluggable unit with lifecycle hooks.
//!
//! Providers are constructed by [`Core::register`](crate::kernel::Core::register)
//! and driven through `init` → `start` → `destroy` by the core. A provider
//! usually registers its services from `init()`.
//!
//! # Examples
//! ```rust,ignore
//! struct VfsProvider {
//!     core: Core,
//! }
//!
//! #[async_trait]
//! impl Provider for VfsProvider {
//!     fn provides(&self) -> Vec<String> {
//!         vec!["osjs/vfs".into()]
//!     }
//!
//!     async fn init(&self) -> Result<(), ProviderError> {
//!         let root = self.core.config_or("vfs.root", "/");
//!         self.core.singleton("osjs/vfs", move |_| Ok(Vfs::new(root.clone())));
//!         Ok(())
//!     }
//! }
//!
//! core.register(|core, _args| Ok(VfsProvider { core: core.clone() }), RegisterOptions::default());
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hearth_support::rendering::shorten_type_name;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ProviderError;

/// Lifecycle hooks the core drives.
///
/// Every hook has a no-op default so a provider only implements what it
/// needs. Hooks take `&self`; providers keep mutable state behind their
/// own locks.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable name used in log lines and errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Service names this provider is expected to register.
    ///
    /// Advisory only; nothing checks it.
    fn provides(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once, in registration order, during the provider's phase.
    ///
    /// The core awaits each `init()` before starting the next one. An
    /// error is logged and the provider is still started.
    async fn init(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Called after every `init()` of the phase has finished.
    ///
    /// Not awaited: spawn any background work from here.
    fn start(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Called once by `Core::destroy()`.
    fn destroy(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// The phase a provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Loaded by `boot()`.
    Early,
    /// Loaded by `start()`.
    Normal,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Early => write!(f, "early"),
            Phase::Normal => write!(f, "normal"),
        }
    }
}

/// How a provider is registered.
///
/// Deserializable so provider lists can live in configuration:
/// `{"before": true, "args": {"root": "/tmp"}}`. `before` accepts any
/// JSON value and is read by truthiness: `null`, `false`, `0` and `""`
/// are false, everything else is true.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegisterOptions {
    /// Load the provider in `boot()` instead of `start()`.
    #[serde(deserialize_with = "truthy")]
    pub before: bool,
    /// Passed to the provider's constructor.
    pub args: Option<Value>,
}

impl RegisterOptions {
    /// Options for a provider loaded by `boot()`.
    pub fn early() -> Self {
        Self {
            before: true,
            args: None,
        }
    }

    /// Sets the constructor arguments.
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    /// The phase these options select.
    pub fn phase(&self) -> Phase {
        if self.before { Phase::Early } else { Phase::Normal }
    }
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}

/// A constructed provider and the options it was registered with.
#[derive(Clone)]
pub struct ProviderEntry {
    pub options: RegisterOptions,
    pub provider: Arc<dyn Provider>,
}

impl ProviderEntry {
    /// Provider name with module paths stripped.
    pub fn display_name(&self) -> String {
        shorten_type_name(self.provider.name())
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.display_name())
            .field("options", &self.options)
            .finish()
    }
}

/// Ordered list of registered providers.
///
/// Entries are never removed one by one; [`clear`](ProviderList::clear)
/// drops them all.
#[derive(Debug, Default)]
pub struct ProviderList {
    entries: Vec<ProviderEntry>,
}

impl ProviderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ProviderEntry) {
        self.entries.push(entry);
    }

    /// Providers of one phase, in registration order.
    pub fn in_phase(&self, phase: Phase) -> Vec<ProviderEntry> {
        self.entries
            .iter()
            .filter(|e| e.options.phase() == phase)
            .cloned()
            .collect()
    }

    /// Every provider, in registration order.
    pub fn all(&self) -> Vec<ProviderEntry> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
