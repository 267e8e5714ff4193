//! Error types for registration and resolution.
//!
//! Every error names the types involved by their short names and, where
//! there is an obvious fix, ends with a hint.

use std::fmt;

use fluentdi_support::rendering::render_chain;

use crate::key::ServiceKey;

/// Main error type for all fluentdi operations.
#[derive(Debug, thiserror::Error)]
pub enum FluentError {
    /// A registration call received input it cannot work with.
    #[error("Invalid argument `{parameter}`: {reason}")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    /// A generic implementation does not close the generic service it was
    /// registered for.
    #[error("{}", .0)]
    DoesNotClose(DoesNotCloseError),

    /// An instance was registered for a service its type does not provide.
    #[error("{}", .0)]
    NotAssignable(NotAssignableError),

    /// Requested service was never registered.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// A service ended up depending on itself while resolving.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// Factory returned an error, or produced a value of the wrong type.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: ServiceKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Service was already registered and overriding is disabled.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),
}

impl FluentError {
    pub fn invalid_argument(parameter: &'static str, reason: impl Into<String>) -> Self {
        FluentError::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn type_mismatch(key: ServiceKey, expected: &str) -> Self {
        FluentError::ConstructionFailed {
            key,
            source: format!("Type mismatch: expected {expected}").into(),
        }
    }
}

/// A generic implementation failed the closure check.
#[derive(Debug)]
pub struct DoesNotCloseError {
    /// The implementation that was offered.
    pub candidate: ServiceKey,
    /// The open generic service it was offered for.
    pub target: ServiceKey,
    /// `candidate` followed by its base types.
    pub chain: Vec<ServiceKey>,
}

impl fmt::Display for DoesNotCloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} does not close {}", self.candidate, self.target)?;

        if self.chain.len() > 1 {
            let names: Vec<String> = self.chain.iter().map(ServiceKey::short_name).collect();
            write!(f, "\n  Inheritance chain: {}", render_chain(&names))?;
        }

        write!(
            f,
            "\n  Hint: {} or one of its base types must implement an instantiation of {}",
            self.candidate, self.target,
        )
    }
}

/// An instance does not implement the service it was registered as.
#[derive(Debug)]
pub struct NotAssignableError {
    pub instance: ServiceKey,
    pub service: ServiceKey,
}

impl fmt::Display for NotAssignableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The given type {} is not assignable to {}",
            self.instance, self.service,
        )
    }
}

/// A requested service has no registration.
#[derive(Debug)]
pub struct NotRegisteredError {
    pub requested: ServiceKey,
    /// The service being built when the missing one was requested.
    pub required_by: Option<ServiceKey>,
    /// Registered names that look similar.
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {}", self.requested)?;

        if let Some(parent) = &self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// A dependency cycle found while resolving.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The services forming the cycle, first one repeated at the end.
    pub chain: Vec<ServiceKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(ServiceKey::short_name).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))
    }
}

/// A second registration for an existing service.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: ServiceKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service already registered: {}", self.key)?;
        write!(
            f,
            "\n  Hint: enable allow_override in ContainerSettings to replace registrations"
        )
    }
}

/// Convenient Result type for fluentdi operations.
pub type Result<T> = std::result::Result<T, FluentError>;
