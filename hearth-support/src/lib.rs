//! # Hearth Support
//!
//! Small helpers shared by the hearth crates:
//! - name shortening for provider type names
//! - "did you mean" suggestions for unknown service names

pub mod rendering;
