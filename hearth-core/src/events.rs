//! Named event bus.
//!
//! The core owns one bus and exposes `on`/`off`/`emit` by delegation.
//! Payloads are JSON values so providers do not need to share types to
//! talk to each other.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

/// Identifies one subscription, returned by [`EventBus::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone)]
struct Subscription {
    id: HandlerId,
    once: bool,
    handler: Handler,
}

/// Event bus keyed by event name.
///
/// Handlers run synchronously, in subscription order, on the thread
/// that calls [`emit`](EventBus::emit). A handler may subscribe or
/// unsubscribe while an event is being delivered; the change applies to
/// the next `emit`.
pub struct EventBus {
    name: String,
    handlers: DashMap<String, Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes `handler` to `event`.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(event.into(), false, Arc::new(handler))
    }

    /// Subscribes `handler` to the next delivery of `event` only.
    pub fn once<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(event.into(), true, Arc::new(handler))
    }

    fn subscribe(&self, event: String, once: bool, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        trace!(bus = %self.name, event = %event, id = %id, once, "Subscribing");
        self.handlers
            .entry(event)
            .or_default()
            .push(Subscription { id, once, handler });
        id
    }

    /// Removes one subscription. Returns `false` if it was not found.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let Some(mut subs) = self.handlers.get_mut(event) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != id);
        before != subs.len()
    }

    /// Removes every subscription to `event`, returning how many there were.
    pub fn off_all(&self, event: &str) -> usize {
        self.handlers
            .remove(event)
            .map(|(_, subs)| subs.len())
            .unwrap_or(0)
    }

    /// Delivers `payload` to every handler of `event`.
    ///
    /// Returns the number of handlers that ran.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let snapshot: Vec<Handler> = match self.handlers.get_mut(event) {
            Some(mut subs) => {
                let handlers = subs.iter().map(|s| s.handler.clone()).collect();
                subs.retain(|s| !s.once);
                handlers
            }
            None => Vec::new(),
        };

        trace!(bus = %self.name, event, handlers = snapshot.len(), "Emitting");
        for handler in &snapshot {
            handler(payload);
        }
        snapshot.len()
    }

    /// Number of live subscriptions to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.get(event).map(|subs| subs.len()).unwrap_or(0)
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        self.handlers.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events: usize = self.handlers.iter().map(|entry| entry.value().len()).sum();
        f.debug_struct("EventBus")
            .field("name", &self.name)
            .field("subscriptions", &events)
            .finish()
    }
}
