//! Instance lifetimes.
//!
//! - [`Lifetime::Singleton`]: one instance per container
//! - [`Lifetime::Scoped`]: one instance per lifetime scope
//! - [`Lifetime::Transient`]: a new instance for every resolve
use std::fmt;

/// How long a resolved instance is shared.
///
/// # Examples
/// ```
/// use fluentdi_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton.is_cached());
/// assert!(!Lifetime::Transient.is_cached());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Created once, on first resolve, and shared by every scope of the
    /// container. Dependencies of a singleton are resolved from the root
    /// scope.
    Singleton,

    /// Created once per lifetime scope. Nested scopes get their own
    /// instance; the container itself acts as the root scope.
    Scoped,

    /// Never cached.
    Transient,
}

impl Lifetime {
    /// Returns `true` if resolved instances are kept and reused.
    #[inline]
    pub fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        };
        f.write_str(name)
    }
}
