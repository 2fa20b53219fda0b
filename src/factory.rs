//! Registry entries describing how a value is produced
//!
//! Every key in the registry maps to one [`Factory`]. An enum keeps the
//! resolver's dispatch a single match instead of a vtable call.

use crate::provider::{Lifetime, Provider, Value};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// How a registered key is satisfied.
pub(crate) enum Factory {
    /// Reserved for the request-scope value; never produced by a provider
    RequestScope,
    /// Pre-computed value, including promoted singletons
    Constant(Value),
    /// New value on every resolution pass
    Transient(Provider),
    /// Computed at most once per container
    Singleton {
        provider: Provider,
        instance: OnceCell<Value>,
    },
}

impl Factory {
    /// Wrap a provider according to its lifetime
    #[inline]
    pub fn from_provider(provider: Provider) -> Self {
        match provider.lifetime() {
            Lifetime::Transient => Factory::Transient(provider),
            Lifetime::Singleton => Factory::Singleton {
                provider,
                instance: OnceCell::new(),
            },
        }
    }

    /// Wrap an existing value
    #[inline]
    pub fn constant(value: Value) -> Self {
        Factory::Constant(value)
    }

    /// Copy this entry for a derived container.
    ///
    /// A computed singleton becomes a constant; an uncomputed one gets a
    /// fresh cell so the two containers never share its instance.
    pub fn fork(&self) -> Self {
        match self {
            Factory::RequestScope => Factory::RequestScope,
            Factory::Constant(value) => Factory::Constant(Arc::clone(value)),
            Factory::Transient(provider) => Factory::Transient(provider.clone()),
            Factory::Singleton { provider, instance } => match instance.get() {
                Some(value) => Factory::Constant(Arc::clone(value)),
                None => Factory::Singleton {
                    provider: provider.clone(),
                    instance: OnceCell::new(),
                },
            },
        }
    }

    /// Short label for logs
    #[cfg_attr(not(feature = "logging"), allow(dead_code))]
    pub fn kind(&self) -> &'static str {
        match self {
            Factory::RequestScope => "request-scope",
            Factory::Constant(_) => "constant",
            Factory::Transient(_) => "transient",
            Factory::Singleton { .. } => "singleton",
        }
    }
}
