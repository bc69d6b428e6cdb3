//! Error types for core operations.
//!
//! Only lookup and teardown failures reach the caller. Registration and
//! init failures are contained and logged by the lifecycle controller.

use std::fmt;

/// Error returned by provider hooks and provider constructors.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// `make()` was called with a name nothing registered.
    #[error("{}", .0)]
    NotFound(NotFoundError),

    /// The service exists but produced a different type than requested.
    #[error("Service '{name}' is a {actual}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The service factory returned an error.
    #[error("Failed to make service '{name}': {source}")]
    FactoryFailed {
        name: String,
        #[source]
        source: ProviderError,
    },

    /// A provider's `destroy()` hook failed; later providers were not torn down.
    #[error("Provider {provider} failed to destroy: {source}")]
    TeardownFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

/// Error when a service name was never registered.
#[derive(Debug)]
pub struct NotFoundError {
    /// The name that was requested.
    pub name: String,
    /// Registered names that look similar.
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider '{}' not found", self.name)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register it with .instance(\"{0}\", ..) or .singleton(\"{0}\", ..) before calling make()",
            self.name
        )
    }
}

/// Convenient Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
