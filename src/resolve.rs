//! Resolution engine
//!
//! A [`Resolver`] satisfies a list of type keys for one pass. Produced
//! values are memoised in the pass's [`ResolvedValues`], so a type needed by
//! several dependents is built once; the request-scope value is seeded and
//! never built.

use crate::factory::Factory;
use crate::provider::{TypeKey, Value};
use crate::registry::Registry;
use crate::scope::ResolvedValues;
use crate::{DiError, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

pub(crate) struct Resolver<'a> {
    registry: &'a Registry,
    values: &'a ResolvedValues,
    seed: Option<(TypeKey, Value)>,
    /// Keys whose providers are currently running
    stack: Vec<TypeKey>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry, values: &'a ResolvedValues) -> Self {
        Self {
            registry,
            values,
            seed: None,
            stack: Vec::new(),
        }
    }

    /// Supply the request-scope value for this pass
    pub fn with_seed(mut self, key: TypeKey, value: Value) -> Self {
        self.seed = Some((key, value));
        self
    }

    /// Resolve every key, in order
    pub fn resolve_all(&mut self, keys: &[TypeKey]) -> Result<Vec<Value>> {
        keys.iter().map(|key| self.resolve(*key)).collect()
    }

    /// Resolve a single key
    pub fn resolve(&mut self, key: TypeKey) -> Result<Value> {
        if let Some((seed_key, seed)) = &self.seed {
            if *seed_key == key {
                return Ok(Arc::clone(seed));
            }
        }

        if let Some(value) = self.values.get(&key) {
            #[cfg(feature = "logging")]
            trace!(
                target: "handler_injector",
                service = key.name(),
                scope = self.values.scope().id(),
                "Reusing value from this pass"
            );
            return Ok(value);
        }

        let factory = self
            .registry
            .get(&key)
            .ok_or_else(|| DiError::unknown_dependency(key))?;

        if self.stack.contains(&key) {
            return Err(DiError::circular(key));
        }

        self.stack.push(key);
        let produced = self.produce(key, &factory);
        self.stack.pop();
        let value = produced?;

        self.values.insert(key, Arc::clone(&value));
        Ok(value)
    }

    fn produce(&mut self, key: TypeKey, factory: &Arc<Factory>) -> Result<Value> {
        #[cfg(feature = "logging")]
        trace!(
            target: "handler_injector",
            service = key.name(),
            kind = factory.kind(),
            scope = self.values.scope().id(),
            "Resolving"
        );

        match factory.as_ref() {
            Factory::RequestScope => Err(DiError::MissingRequestScope {
                type_name: key.name(),
            }),
            Factory::Constant(value) => Ok(Arc::clone(value)),
            Factory::Transient(provider) => {
                let args = self.resolve_all(provider.inputs())?;
                provider.call(&args)
            }
            Factory::Singleton { provider, instance } => {
                let value = Arc::clone(instance.get_or_try_init(|| {
                    let args = self.resolve_all(provider.inputs())?;
                    provider.call(&args)
                })?);
                self.registry.promote(key, factory, Arc::clone(&value));
                Ok(value)
            }
        }
    }
}
