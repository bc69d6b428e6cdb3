//! Service registry — named factories and the singleton cache.
//!
//! Entries are kept in registration order. Names are not required to be
//! unique: a name→index map points at the *first* entry registered under
//! a name, so later duplicates are stored but never resolved.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hearth_support::rendering::suggest_similar;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{CoreError, NotFoundError, ProviderError, Result};
use crate::lifetime::Lifetime;

/// A type-erased service value.
pub type SharedValue = Arc<dyn Any + Send + Sync>;

/// Type alias for factory functions.
///
/// A factory receives the arguments passed to `make()` and returns a
/// type-erased value or an error.
pub type FactoryFn = Arc<dyn Fn(&[Value]) -> std::result::Result<SharedValue, ProviderError> + Send + Sync>;

/// Registration entry for a single service.
#[derive(Clone)]
pub(crate) struct ServiceEntry {
    pub name: String,
    pub lifetime: Lifetime,
    pub type_name: &'static str,
    pub factory: FactoryFn,
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<ServiceEntry>,
    first_by_name: HashMap<String, usize>,
    instances: HashMap<String, SharedValue>,
}

/// Stores service registrations and cached singleton values.
///
/// All methods take `&self`. The internal lock is released before a
/// factory runs, so factories may call back into the registry to make
/// their own dependencies.
#[derive(Default)]
pub struct ServiceRegistry {
    inner: Mutex<Inner>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed factory under `name`.
    pub fn register<T, F>(&self, name: impl Into<String>, lifetime: Lifetime, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&[Value]) -> std::result::Result<T, ProviderError> + Send + Sync + 'static,
    {
        let erased: FactoryFn = Arc::new(move |args: &[Value]| {
            factory(args).map(|value| Arc::new(value) as SharedValue)
        });
        self.register_erased(name.into(), lifetime, type_name::<T>(), erased);
    }

    pub(crate) fn register_erased(
        &self,
        name: String,
        lifetime: Lifetime,
        type_name: &'static str,
        factory: FactoryFn,
    ) {
        debug!(service = %name, lifetime = %lifetime, "Registering service");

        let mut inner = self.inner.lock();
        let index = inner.entries.len();
        inner.first_by_name.entry(name.clone()).or_insert(index);
        inner.entries.push(ServiceEntry {
            name,
            lifetime,
            type_name,
            factory,
        });
    }

    /// Returns `true` if anything was registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.inner.lock().first_by_name.contains_key(name)
    }

    /// Makes a service and downcasts it to `T`.
    ///
    /// # Errors
    /// - [`CoreError::NotFound`] — nothing registered under `name`
    /// - [`CoreError::FactoryFailed`] — the factory returned an error
    /// - [`CoreError::TypeMismatch`] — the service is not a `T`
    pub fn make<T: Send + Sync + 'static>(&self, name: &str, args: &[Value]) -> Result<Arc<T>> {
        let (value, actual) = self.make_with_type(name, args)?;

        value.downcast::<T>().map_err(|_| CoreError::TypeMismatch {
            name: name.to_string(),
            expected: type_name::<T>(),
            actual,
        })
    }

    /// Makes a service without downcasting it.
    pub fn make_any(&self, name: &str, args: &[Value]) -> Result<SharedValue> {
        self.make_with_type(name, args).map(|(value, _)| value)
    }

    fn make_with_type(&self, name: &str, args: &[Value]) -> Result<(SharedValue, &'static str)> {
        let entry = {
            let inner = self.inner.lock();
            let entry = inner
                .first_by_name
                .get(name)
                .map(|&index| inner.entries[index].clone())
                .ok_or_else(|| self.not_found(&inner, name))?;

            if let Some(cached) = inner.instances.get(name) {
                trace!(service = name, "Returning cached singleton");
                return Ok((cached.clone(), entry.type_name));
            }
            entry
        };

        trace!(service = name, lifetime = %entry.lifetime, "Running factory");
        let value = (entry.factory)(args).map_err(|source| CoreError::FactoryFailed {
            name: name.to_string(),
            source,
        })?;

        if !entry.lifetime.is_cached() {
            return Ok((value, entry.type_name));
        }

        // A factory that made its own name re-entrantly may have stored a
        // value already; the first stored value wins.
        let mut inner = self.inner.lock();
        let cached = inner
            .instances
            .entry(name.to_string())
            .or_insert(value)
            .clone();
        Ok((cached, entry.type_name))
    }

    fn not_found(&self, inner: &Inner, name: &str) -> CoreError {
        let names: Vec<&str> = inner.entries.iter().map(|e| e.name.as_str()).collect();
        CoreError::NotFound(NotFoundError {
            name: name.to_string(),
            suggestions: suggest_similar(name, &names, 3),
        })
    }

    /// Drops every cached singleton value. Registrations are kept.
    pub fn clear_instances(&self) {
        let mut inner = self.inner.lock();
        debug!(cached = inner.instances.len(), "Clearing instance cache");
        inner.instances.clear();
    }

    /// Number of cached singleton values.
    pub fn cached_count(&self) -> usize {
        self.inner.lock().instances.len()
    }

    /// Registered names in registration order, duplicates included.
    pub fn names(&self) -> Vec<String> {
        self.inner.lock().entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Returns the number of registrations, duplicates included.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ServiceRegistry")
            .field("entries", &inner.entries)
            .field("cached", &inner.instances.len())
            .finish()
    }
}
