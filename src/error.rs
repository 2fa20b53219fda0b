//! Error types for dependency injection

use crate::TypeKey;
use std::any::TypeId;
use thiserror::Error;

/// Errors that can occur while registering providers, handlers and
/// controllers, or while resolving values for a request.
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Provider does not declare exactly one usable output
    #[error("cannot register provider {signature}: {reason}")]
    InvalidProvider {
        signature: String,
        reason: &'static str,
    },

    /// A required type has no registered provider
    #[error("cannot inject value for unregistered type {type_name}")]
    UnknownDependency {
        type_name: &'static str,
        type_id: TypeId,
    },

    /// Providers left over once registration stopped making progress
    #[error("{}", describe_unsatisfiable(.signatures, .missing))]
    UnsatisfiableProviders {
        signatures: Vec<String>,
        missing: Vec<&'static str>,
    },

    /// Handler cannot be bound to the route sink
    #[error("invalid request handler {handler}: {reason}")]
    InvalidHandler { handler: String, reason: String },

    /// Route mapping names a method the controller does not expose
    #[error("cannot register unknown request handler method {method} for controller {controller}")]
    UnknownControllerMethod {
        controller: &'static str,
        method: String,
    },

    /// Controller method does not take the request-scope value first
    #[error(
        "controller {controller} method {method} must take {expected} as its first parameter, found {found}"
    )]
    InvalidControllerMethodSignature {
        controller: &'static str,
        method: String,
        expected: &'static str,
        found: String,
    },

    /// Resolution re-entered a type it was still producing
    #[error("circular dependency detected while resolving: {type_name}")]
    CircularDependency { type_name: &'static str },

    /// The request-scope marker was reached without a seeded value
    #[error("request-scope value {type_name} was not supplied to this resolution")]
    MissingRequestScope { type_name: &'static str },

    /// Several registration errors reported together
    #[error("{}", describe_errors(.0))]
    Multiple(Vec<DiError>),

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create an UnknownDependency error for a type key
    #[inline]
    pub fn unknown_dependency(key: TypeKey) -> Self {
        Self::UnknownDependency {
            type_name: key.name(),
            type_id: key.id(),
        }
    }

    /// Create a CircularDependency error for a type key
    #[inline]
    pub fn circular(key: TypeKey) -> Self {
        Self::CircularDependency {
            type_name: key.name(),
        }
    }

    /// Create an InvalidHandler error
    #[inline]
    pub fn invalid_handler(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHandler {
            handler: handler.into(),
            reason: reason.into(),
        }
    }

    /// Fold collected errors into a single result.
    ///
    /// No errors is `Ok`, one error is returned as-is and anything more is
    /// wrapped in [`DiError::Multiple`].
    pub fn collect(mut errors: Vec<DiError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Iterate over this error and, for [`DiError::Multiple`], every
    /// aggregated error.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &DiError> + '_> {
        match self {
            Self::Multiple(errors) => Box::new(errors.iter().flat_map(|e| e.iter())),
            other => Box::new(std::iter::once(other)),
        }
    }
}

fn describe_unsatisfiable(signatures: &[String], missing: &[&'static str]) -> String {
    format!(
        "cannot register providers, missing dependencies [{}]; signatures:\n{}",
        missing.join(", "),
        signatures.join("\n")
    )
}

fn describe_errors(errors: &[DiError]) -> String {
    let lines: Vec<String> = errors.iter().map(|e| format!(" - {e}")).collect();
    format!("{} registration errors:\n{}", errors.len(), lines.join("\n"))
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
