//! Provider lifecycle and service registry for hearth.

pub mod config;
pub mod error;
pub mod events;
pub mod kernel;
pub mod lifecycle;
pub mod lifetime;
pub mod logger;
pub mod provider;
pub mod registry;

pub use kernel::{Core, CoreBuilder, prelude};
pub use config::Configuration;
pub use error::{CoreError, ProviderError, Result};
pub use events::{EventBus, HandlerId};
pub use lifecycle::CoreState;
pub use lifetime::Lifetime;
pub use provider::{Phase, Provider, RegisterOptions};
