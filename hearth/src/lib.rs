//! # Hearth — provider lifecycle for modular runtimes
//!
//! Register providers, boot them in two ordered phases, and resolve
//! services by name from a registry of instance and singleton factories.

pub use hearth_core::*;
pub use hearth_support::*;
