//! Service lifetimes.
//!
//! A lifetime decides whether `make()` reuses a value:
//! - [`Lifetime::Singleton`] — created on first `make()`, cached until the core is destroyed
//! - [`Lifetime::Instance`] — factory runs on every `make()`
use std::fmt;

/// How long a resolved service value lives.
///
/// # Examples
/// ```
/// use hearth_core::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton.is_cached());
/// assert!(!Lifetime::Instance.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// New value on every `make()` call.
    ///
    /// Arguments passed to `make()` reach the factory every time.
    Instance,

    /// One value shared by every `make()` call.
    ///
    /// Only the arguments of the first `make()` reach the factory; later
    /// arguments are ignored while the value is cached. The cache is
    /// dropped by `destroy()`, after which the next `make()` runs the
    /// factory again.
    Singleton,
}

impl Lifetime {
    /// Returns `true` if resolved values are kept in the instance cache.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Instance => write!(f, "instance"),
            Lifetime::Singleton => write!(f, "singleton"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_singletons_are_cached() {
        assert!(Lifetime::Singleton.is_cached());
        assert!(!Lifetime::Instance.is_cached());
    }

    #[test]
    fn lifetime_display() {
        assert_eq!(Lifetime::Singleton.to_string(), "singleton");
        assert_eq!(Lifetime::Instance.to_string(), "instance");
    }
}
