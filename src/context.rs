//! Default request context
//!
//! [`Context`] is a cheap-to-clone handle a route sink can create once per
//! request. Clones share the same values and cancellation flag.

use crate::provider::Value;
use crate::scope::RequestContext;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

struct Inner {
    values: DashMap<String, Value, RandomState>,
    cancelled: AtomicBool,
}

/// Request-scope value backed by a concurrent map.
///
/// # Examples
///
/// ```rust
/// use handler_injector::{Context, RequestContext};
/// use std::sync::Arc;
///
/// let ctx = Context::new().with_value("user", Arc::new(String::from("alice")));
/// let user = ctx.value("user").unwrap().downcast::<String>().unwrap();
/// assert_eq!(user.as_str(), "alice");
///
/// ctx.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                values: DashMap::with_hasher(RandomState::new()),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    /// Builder-style [`RequestContext::set_value`]
    pub fn with_value(self, key: impl Into<String>, value: Value) -> Self {
        self.inner.values.insert(key.into(), value);
        self
    }

    /// Mark the request as cancelled
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext for Context {
    fn value(&self, key: &str) -> Option<Value> {
        self.inner
            .values
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn set_value(&self, key: &str, value: Value) {
        self.inner.values.insert(key.to_string(), value);
    }

    fn remove_value(&self, key: &str) -> Option<Value> {
        self.inner.values.remove(key).map(|(_, value)| value)
    }

    fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("values", &self.inner.values.len())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
