//! Request handlers and their adaptation to a route sink
//!
//! A [`Handler`] is any function whose first parameter is the request
//! context and whose remaining parameters are registered types. Adapting it
//! yields a [`BoundHandler`], which the route sink calls with nothing but
//! the context.

use crate::provider::{Injectable, TypeKey, Value, take};
use crate::registry::Registry;
use crate::resolve::Resolver;
use crate::scope::{RequestContext, ResolvedValues};
use crate::{DiError, Result};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::error;

/// Type-erased handler call: the context followed by the resolved parameters.
pub(crate) type HandlerFn = Arc<dyn Fn(&[Value]) -> Result<()> + Send + Sync>;

/// Handler call that resolves within a pass owned by the caller.
pub(crate) type PassFn<C> = Arc<dyn Fn(&C, &ResolvedValues) -> Result<()> + Send + Sync>;

/// A request handler before it is bound to a container.
///
/// # Examples
///
/// ```rust
/// use handler_injector::{Context, Handler};
///
/// #[derive(Clone)]
/// struct Greeting(&'static str);
///
/// let handler = Handler::new(|_ctx: Context, greeting: Greeting| {
///     println!("{}", greeting.0);
/// })
/// .with_name("greet");
///
/// assert_eq!(handler.name(), "greet");
/// ```
#[derive(Clone)]
pub struct Handler {
    name: String,
    first: Option<TypeKey>,
    params: Vec<TypeKey>,
    call: HandlerFn,
}

impl Handler {
    /// Create a handler from a function or closure
    #[inline]
    pub fn new<Args, F: IntoHandler<Args>>(handler: F) -> Self {
        handler.into_handler()
    }

    /// Replace the name used in errors and logs
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name used in errors and logs
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Types injected after the leading context parameter
    #[inline]
    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }

    pub(crate) fn from_parts(name: &str, mut keys: Vec<TypeKey>, call: HandlerFn) -> Self {
        let first = if keys.is_empty() {
            None
        } else {
            Some(keys.remove(0))
        };
        Self {
            name: name.to_string(),
            first,
            params: keys,
            call,
        }
    }

    /// Check the handler against a registry, producing a call that resolves
    /// its parameters within a pass supplied by the caller.
    pub(crate) fn bind_in_pass<C: RequestContext>(
        self,
        registry: &Arc<Registry>,
    ) -> Result<(Arc<str>, PassFn<C>)> {
        let context = TypeKey::of::<C>();
        match self.first {
            None => {
                return Err(DiError::invalid_handler(
                    &self.name,
                    format!("handler must take {context} as its first parameter"),
                ));
            }
            Some(first) if first != context => {
                return Err(DiError::invalid_handler(
                    &self.name,
                    format!("first parameter must be {context}, found {first}"),
                ));
            }
            Some(_) => {}
        }

        DiError::collect(
            self.params
                .iter()
                .filter(|key| !registry.contains(key))
                .map(|key| DiError::unknown_dependency(*key))
                .collect(),
        )?;

        let registry = Arc::clone(registry);
        let Handler {
            name, params, call, ..
        } = self;
        let name: Arc<str> = Arc::from(name);
        #[cfg(feature = "logging")]
        let label = Arc::clone(&name);

        let bound: PassFn<C> = Arc::new(move |ctx: &C, pass: &ResolvedValues| -> Result<()> {
            let seed: Value = Arc::new(ctx.clone());
            let result = Resolver::new(&registry, pass)
                .with_seed(context, Arc::clone(&seed))
                .resolve_all(&params)
                .and_then(|mut args| {
                    args.insert(0, seed);
                    call(&args)
                });

            #[cfg(feature = "logging")]
            if let Err(err) = &result {
                error!(
                    target: "handler_injector",
                    handler = %label,
                    scope = pass.scope().id(),
                    error = %err,
                    "Request handler failed"
                );
            }

            result
        });

        Ok((name, bound))
    }

    /// Bind with a fresh resolution pass per call
    pub(crate) fn bind_fresh<C: RequestContext>(
        self,
        registry: &Arc<Registry>,
    ) -> Result<BoundHandler<C>> {
        let (name, call) = self.bind_in_pass::<C>(registry)?;
        Ok(BoundHandler::from_fn(name, move |ctx: &C| {
            call(ctx, &ResolvedValues::new())
        }))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("first", &self.first)
            .field("params", &self.params)
            .finish()
    }
}

/// Conversion from a Rust callable into a [`Handler`].
///
/// Implemented for every `Fn(P0, .., Pn) -> R` with up to 12 parameters. The
/// return value is ignored.
pub trait IntoHandler<Args>: Send + Sync + 'static {
    /// Erase the callable into a handler.
    fn into_handler(self) -> Handler;
}

macro_rules! impl_into_handler {
    ($($P:ident),*) => {
        impl<F, R, $($P,)*> IntoHandler<($($P,)*)> for F
        where
            F: Fn($($P),*) -> R + Send + Sync + 'static,
            R: 'static,
            $($P: Injectable + Clone,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_handler(self) -> Handler {
                let keys = vec![$(TypeKey::of::<$P>()),*];
                let call: HandlerFn = Arc::new(move |args: &[Value]| {
                    let mut args = args.iter();
                    $(let $P = take::<$P>(args.next())?;)*
                    let _ = (self)($($P),*);
                    Ok(())
                });
                Handler::from_parts(std::any::type_name::<F>(), keys, call)
            }
        }
    };
}

impl_into_handler!();
impl_into_handler!(A);
impl_into_handler!(A, B);
impl_into_handler!(A, B, C);
impl_into_handler!(A, B, C, D);
impl_into_handler!(A, B, C, D, E);
impl_into_handler!(A, B, C, D, E, G);
impl_into_handler!(A, B, C, D, E, G, H);
impl_into_handler!(A, B, C, D, E, G, H, I);
impl_into_handler!(A, B, C, D, E, G, H, I, J);
impl_into_handler!(A, B, C, D, E, G, H, I, J, K);
impl_into_handler!(A, B, C, D, E, G, H, I, J, K, L);
impl_into_handler!(A, B, C, D, E, G, H, I, J, K, L, M);

/// A handler bound to a container, callable with only the request context.
pub struct BoundHandler<C> {
    name: Arc<str>,
    call: Arc<dyn Fn(&C) -> Result<()> + Send + Sync>,
}

impl<C> BoundHandler<C> {
    /// Name of the underlying handler or controller method
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve the handler's parameters for this request and invoke it.
    #[inline]
    pub fn call(&self, ctx: &C) -> Result<()> {
        (self.call)(ctx)
    }

    pub(crate) fn from_fn<F>(name: Arc<str>, call: F) -> Self
    where
        F: Fn(&C) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            call: Arc::new(call),
        }
    }
}

impl<C> Clone for BoundHandler<C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            call: Arc::clone(&self.call),
        }
    }
}

impl<C> fmt::Debug for BoundHandler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("name", &self.name)
            .finish()
    }
}
