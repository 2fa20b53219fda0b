//! Provider types for dependency injection
//!
//! A [`Provider`] is a type-erased constructor: an ordered list of input
//! [`TypeKey`]s, the key of the value it produces and a call function. Any
//! Rust closure or function taking injectable parameters converts into one
//! through [`IntoProvider`].

use crate::{DiError, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased value flowing through the resolution engine.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Marker trait for types that can be injected via the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// Identifies a data type for dependency matching.
///
/// Equality and hashing only consider the underlying [`TypeId`]; the type
/// name is carried for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for type `T`
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying type id
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How long a provided value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Invoked on every resolution pass that needs the value
    #[default]
    Transient,

    /// Invoked at most once per container, then cached
    Singleton,
}

/// Type-erased provider call: receives resolved inputs in declared order.
pub type ProviderFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A registered or to-be-registered value constructor.
///
/// # Examples
///
/// ```rust
/// use handler_injector::{Lifetime, Provider, TypeKey};
///
/// #[derive(Clone)]
/// struct Config { url: String }
///
/// #[derive(Clone)]
/// struct Database { url: String }
///
/// let provider = Provider::new(|config: Config| Database { url: config.url });
/// assert_eq!(provider.inputs(), &[TypeKey::of::<Config>()]);
/// assert_eq!(provider.output(), Some(TypeKey::of::<Database>()));
/// assert_eq!(provider.lifetime(), Lifetime::Transient);
///
/// let cached = Provider::singleton(|| Config { url: "postgres://localhost".into() });
/// assert!(cached.is_singleton());
/// ```
#[derive(Clone)]
pub struct Provider {
    inputs: Vec<TypeKey>,
    outputs: Vec<TypeKey>,
    lifetime: Lifetime,
    call: ProviderFn,
}

impl Provider {
    /// Create a transient provider from a closure or function.
    #[inline]
    pub fn new<Args, F: IntoProvider<Args>>(provider: F) -> Self {
        provider.into_provider()
    }

    /// Create a singleton provider from a closure or function.
    #[inline]
    pub fn singleton<Args, F: IntoProvider<Args>>(provider: F) -> Self {
        provider.into_provider().into_singleton()
    }

    /// Build a provider from explicit key lists.
    ///
    /// The output list is validated at registration: anything other than
    /// exactly one key is rejected. `call` receives the resolved inputs in
    /// the order of `inputs`.
    pub fn from_raw<F>(inputs: Vec<TypeKey>, outputs: Vec<TypeKey>, call: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            inputs,
            outputs,
            lifetime: Lifetime::Transient,
            call: Arc::new(call),
        }
    }

    /// Wrap this provider so its value is computed once per container.
    #[inline]
    pub fn into_singleton(mut self) -> Self {
        self.lifetime = Lifetime::Singleton;
        self
    }

    /// Declared input keys, in call order
    #[inline]
    pub fn inputs(&self) -> &[TypeKey] {
        &self.inputs
    }

    /// Declared output keys
    #[inline]
    pub fn outputs(&self) -> &[TypeKey] {
        &self.outputs
    }

    /// The single output key, if the provider declares exactly one
    #[inline]
    pub fn output(&self) -> Option<TypeKey> {
        match self.outputs.as_slice() {
            [key] => Some(*key),
            _ => None,
        }
    }

    /// Provider lifetime
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Check if singleton
    #[inline]
    pub fn is_singleton(&self) -> bool {
        self.lifetime == Lifetime::Singleton
    }

    /// Full signature, e.g. `(app::Config, app::Pool) -> app::Database`
    pub fn signature(&self) -> String {
        let inputs: Vec<&str> = self.inputs.iter().map(TypeKey::name).collect();
        let outputs = match self.outputs.as_slice() {
            [] => "()".to_string(),
            [key] => key.name().to_string(),
            keys => {
                let names: Vec<&str> = keys.iter().map(TypeKey::name).collect();
                format!("({})", names.join(", "))
            }
        };
        format!("({}) -> {}", inputs.join(", "), outputs)
    }

    /// Invoke with resolved inputs
    #[inline]
    pub(crate) fn call(&self, args: &[Value]) -> Result<Value> {
        (self.call)(args)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("signature", &self.signature())
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Conversion from a Rust callable into a [`Provider`].
///
/// Implemented for every `Fn(P1, .., Pn) -> T` with up to 12 parameters,
/// where each parameter is `Injectable + Clone` and `T` is `Injectable`.
/// A callable returning `()` declares no output and is rejected at
/// registration.
pub trait IntoProvider<Args>: Send + Sync + 'static {
    /// Erase the callable into a provider.
    fn into_provider(self) -> Provider;
}

/// Output keys for a provider returning `T`; unit means no output.
pub(crate) fn output_keys<T: 'static>() -> Vec<TypeKey> {
    if TypeId::of::<T>() == TypeId::of::<()>() {
        Vec::new()
    } else {
        vec![TypeKey::of::<T>()]
    }
}

/// Clone the next argument out of a resolved value list.
#[inline]
pub(crate) fn take<T: Injectable + Clone>(value: Option<&Value>) -> Result<T> {
    value
        .and_then(|v| v.downcast_ref::<T>())
        .cloned()
        .ok_or_else(|| {
            DiError::Internal(format!(
                "resolved argument does not match declared type {}",
                std::any::type_name::<T>()
            ))
        })
}

macro_rules! impl_into_provider {
    ($($P:ident),*) => {
        impl<F, T, $($P,)*> IntoProvider<($($P,)*)> for F
        where
            F: Fn($($P),*) -> T + Send + Sync + 'static,
            T: Injectable,
            $($P: Injectable + Clone,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_provider(self) -> Provider {
                let inputs = vec![$(TypeKey::of::<$P>()),*];
                let call: ProviderFn = Arc::new(move |args: &[Value]| {
                    let mut args = args.iter();
                    $(let $P = take::<$P>(args.next())?;)*
                    Ok(Arc::new((self)($($P),*)) as Value)
                });

                Provider {
                    inputs,
                    outputs: output_keys::<T>(),
                    lifetime: Lifetime::Transient,
                    call,
                }
            }
        }
    };
}

impl_into_provider!();
impl_into_provider!(A);
impl_into_provider!(A, B);
impl_into_provider!(A, B, C);
impl_into_provider!(A, B, C, D);
impl_into_provider!(A, B, C, D, E);
impl_into_provider!(A, B, C, D, E, G);
impl_into_provider!(A, B, C, D, E, G, H);
impl_into_provider!(A, B, C, D, E, G, H, I);
impl_into_provider!(A, B, C, D, E, G, H, I, J);
impl_into_provider!(A, B, C, D, E, G, H, I, J, K);
impl_into_provider!(A, B, C, D, E, G, H, I, J, K, L);
impl_into_provider!(A, B, C, D, E, G, H, I, J, K, L, M);
