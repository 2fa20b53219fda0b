//! Request scope support
//!
//! A request scope is the value the route sink hands to every bound handler.
//! Each resolution pass collects the values it produced in a
//! [`ResolvedValues`], identified by a unique [`Scope`] for tracing.

use crate::provider::{TypeKey, Value};
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Unique scope identifier.
///
/// Each resolution pass gets a unique ID for tracking and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope(u64);

impl Scope {
    /// Generate a new unique scope ID.
    #[inline]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Capability the request-scope value must offer.
///
/// The route sink passes one value of this type per request to each
/// handler in its chain. It carries request-local key/value pairs and a
/// cancellation flag; providers and handlers that need it simply declare it
/// as a parameter.
pub trait RequestContext: Clone + Send + Sync + 'static {
    /// Look up a request-local value
    fn value(&self, key: &str) -> Option<Value>;

    /// Store a request-local value, replacing any previous one
    fn set_value(&self, key: &str, value: Value);

    /// Remove a request-local value, returning it
    fn remove_value(&self, key: &str) -> Option<Value>;

    /// Whether the request has been cancelled
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Values produced during one resolution pass.
///
/// Shared by every handler of a controller chain within one request and
/// dropped when the chain returns. The lock is never held across a provider
/// call.
pub struct ResolvedValues {
    scope: Scope,
    values: Mutex<HashMap<TypeKey, Value, RandomState>>,
}

impl ResolvedValues {
    /// Start an empty pass with a fresh scope id
    pub fn new() -> Self {
        Self {
            scope: Scope::new(),
            values: Mutex::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    /// Scope id of this pass
    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Value already produced for `key`, if any
    pub fn get(&self, key: &TypeKey) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Record a produced value
    pub fn insert(&self, key: TypeKey, value: Value) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    /// Number of values produced so far
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for ResolvedValues {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolvedValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedValues")
            .field("scope", &self.scope)
            .field("len", &self.len())
            .finish()
    }
}
