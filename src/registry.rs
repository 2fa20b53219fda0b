//! Provider registry and batch registration
//!
//! Uses DashMap for lock-free concurrent reads. Entries are stored as
//! `Arc<Factory>` so the resolver can clone one out and release the shard
//! before invoking user code.

use crate::factory::Factory;
use crate::provider::{Provider, TypeKey, Value};
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Thread-safe map from data type to the entry that produces it.
pub(crate) struct Registry {
    factories: DashMap<TypeKey, Arc<Factory>, RandomState>,
}

impl Registry {
    /// Create new empty registry.
    ///
    /// Eight shards is plenty for the handful of types a web service
    /// registers.
    #[inline]
    pub fn new() -> Self {
        Self {
            factories: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Insert or overwrite an entry
    #[inline]
    pub fn insert(&self, key: TypeKey, factory: Factory) {
        self.factories.insert(key, Arc::new(factory));
    }

    /// Get the entry for a key without holding the shard lock
    #[inline]
    pub fn get(&self, key: &TypeKey) -> Option<Arc<Factory>> {
        self.factories.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if a key is registered
    #[inline]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.factories.contains_key(key)
    }

    /// Number of registered keys
    #[inline]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Copy every entry into an independent registry.
    pub fn fork(&self) -> Self {
        let forked = Self::new();
        for entry in self.factories.iter() {
            forked
                .factories
                .insert(*entry.key(), Arc::new(entry.value().fork()));
        }
        forked
    }

    /// Replace a resolved singleton with a constant holding its value.
    ///
    /// Only replaces the entry if it is still `current`, so a registration
    /// that landed in the meantime is kept.
    pub fn promote(&self, key: TypeKey, current: &Arc<Factory>, value: Value) {
        if let Some(mut slot) = self.factories.get_mut(&key) {
            if Arc::ptr_eq(slot.value(), current) {
                *slot = Arc::new(Factory::constant(value));

                #[cfg(feature = "logging")]
                trace!(
                    target: "handler_injector",
                    service = key.name(),
                    "Promoted singleton to constant"
                );
            }
        }
    }

    /// Register a batch of providers.
    ///
    /// Every provider must declare exactly one output other than
    /// `request_scope`; otherwise nothing is installed. The rest are
    /// installed as soon as all of their inputs are registered, repeating
    /// until the batch is exhausted or a pass makes no progress.
    pub fn register_all(&self, providers: Vec<Provider>, request_scope: TypeKey) -> Result<()> {
        let mut invalid = Vec::new();
        for provider in &providers {
            let reason = match provider.output() {
                Some(key) if key == request_scope => {
                    Some("provider cannot produce the request-scope value")
                }
                Some(_) => None,
                None if provider.outputs().is_empty() => Some("provider must return a value"),
                None => Some("provider must return exactly one value"),
            };
            if let Some(reason) = reason {
                invalid.push(DiError::InvalidProvider {
                    signature: provider.signature(),
                    reason,
                });
            }
        }
        DiError::collect(invalid)?;

        let mut pending = providers;
        loop {
            let attempted = pending.len();
            let mut unregistered = Vec::new();

            for provider in pending {
                if provider.inputs().iter().all(|key| self.contains(key)) {
                    self.install(provider);
                } else {
                    unregistered.push(provider);
                }
            }

            if unregistered.is_empty() {
                return Ok(());
            }
            if unregistered.len() == attempted {
                return Err(self.unsatisfiable(&unregistered));
            }
            pending = unregistered;
        }
    }

    fn install(&self, provider: Provider) {
        let Some(key) = provider.output() else {
            return;
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "handler_injector",
            service = key.name(),
            lifetime = ?provider.lifetime(),
            inputs = provider.inputs().len(),
            "Registering provider"
        );

        self.insert(key, Factory::from_provider(provider));
    }

    fn unsatisfiable(&self, providers: &[Provider]) -> DiError {
        let mut missing: Vec<&'static str> = Vec::new();
        for key in providers.iter().flat_map(|p| p.inputs()) {
            if !self.contains(key) && !missing.contains(&key.name()) {
                missing.push(key.name());
            }
        }

        DiError::UnsatisfiableProviders {
            signatures: providers.iter().map(Provider::signature).collect(),
            missing,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
