//! Dependency injection container for request handlers
//!
//! The [`Injector`] owns the provider registry and a route sink. Handlers and
//! controllers registered through it are validated against the registry and
//! handed to the sink as chains of [`BoundHandler`]s.

use crate::controller::{Controller, bind_controller};
use crate::factory::Factory;
use crate::handler::{BoundHandler, Handler};
use crate::provider::{Injectable, IntoProvider, Provider, TypeKey};
use crate::registry::Registry;
use crate::resolve::Resolver;
use crate::scope::ResolvedValues;
use crate::sink::RouteSink;
use crate::{DiError, Result};
use http::Method;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Injects registered values into handlers and controllers.
///
/// # Examples
///
/// ```rust
/// use handler_injector::{BoundHandler, Context, Handler, Injector, RouteSink};
/// use http::Method;
///
/// #[derive(Default)]
/// struct Routes(Vec<(Method, String, Vec<BoundHandler<Context>>)>);
///
/// impl RouteSink for Routes {
///     type Context = Context;
///
///     fn handle(&mut self, method: Method, path: &str, handlers: Vec<BoundHandler<Context>>) {
///         self.0.push((method, path.to_string(), handlers));
///     }
///
///     fn use_middleware(&mut self, _: Vec<BoundHandler<Context>>) {}
/// }
///
/// #[derive(Clone)]
/// struct Config { name: &'static str }
///
/// let mut injector = Injector::new(Routes::default());
/// injector.register_singleton(|| Config { name: "demo" }).unwrap();
/// injector
///     .handle(
///         Method::GET,
///         "/hello",
///         vec![Handler::new(|_ctx: Context, config: Config| {
///             println!("hello from {}", config.name);
///         })],
///     )
///     .unwrap();
///
/// let (_, _, chain) = &injector.sink().0[0];
/// chain[0].call(&Context::new()).unwrap();
/// ```
pub struct Injector<S: RouteSink> {
    sink: S,
    registry: Arc<Registry>,
}

impl<S: RouteSink> Injector<S> {
    /// Create an injector whose request-scope type is the sink's context.
    pub fn new(sink: S) -> Self {
        let registry = Registry::new();
        registry.insert(Self::context_key(), Factory::RequestScope);

        #[cfg(feature = "logging")]
        debug!(
            target: "handler_injector",
            context = Self::context_key().name(),
            "Creating new injector"
        );

        Self {
            sink,
            registry: Arc::new(registry),
        }
    }

    /// Create an injector that starts with a copy of `parent`'s providers.
    ///
    /// Singletons the parent already computed are shared as constants; the
    /// rest are computed independently. Later registrations on either side
    /// are not visible to the other.
    pub fn from_parent<P>(parent: &Injector<P>, sink: S) -> Self
    where
        P: RouteSink<Context = S::Context>,
    {
        #[cfg(feature = "logging")]
        debug!(
            target: "handler_injector",
            parent_services = parent.registry.len(),
            "Deriving injector from parent"
        );

        Self {
            sink,
            registry: Arc::new(parent.registry.fork()),
        }
    }

    fn context_key() -> TypeKey {
        TypeKey::of::<S::Context>()
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a batch of providers.
    ///
    /// Providers may appear in any order within the batch. Fails if a
    /// provider does not produce exactly one value, produces the request
    /// context, or depends on a type nothing provides.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use handler_injector::{Context, Injector, Provider};
    /// # use handler_injector::{BoundHandler, RouteSink};
    /// # struct Sink;
    /// # impl RouteSink for Sink {
    /// #     type Context = Context;
    /// #     fn handle(&mut self, _: http::Method, _: &str, _: Vec<BoundHandler<Context>>) {}
    /// #     fn use_middleware(&mut self, _: Vec<BoundHandler<Context>>) {}
    /// # }
    ///
    /// #[derive(Clone)]
    /// struct Url(String);
    ///
    /// #[derive(Clone)]
    /// struct Pool { url: String }
    ///
    /// let injector = Injector::new(Sink);
    /// injector
    ///     .register_providers([
    ///         Provider::singleton(|url: Url| Pool { url: url.0 }),
    ///         Provider::new(|| Url("postgres://localhost".into())),
    ///     ])
    ///     .unwrap();
    ///
    /// assert!(injector.contains::<Pool>());
    /// ```
    pub fn register_providers(&self, providers: impl IntoIterator<Item = Provider>) -> Result<()> {
        self.registry
            .register_all(providers.into_iter().collect(), Self::context_key())
    }

    /// Register a single transient provider.
    pub fn register_provider<Args, F: IntoProvider<Args>>(&self, provider: F) -> Result<()> {
        self.register_providers([Provider::new(provider)])
    }

    /// Register a single provider whose value is computed once.
    pub fn register_singleton<Args, F: IntoProvider<Args>>(&self, provider: F) -> Result<()> {
        self.register_providers([Provider::singleton(provider)])
    }

    /// Bind a handler to this injector without registering a route.
    pub fn adapt(&self, handler: Handler) -> Result<BoundHandler<S::Context>> {
        handler.bind_fresh(&self.registry)
    }

    fn adapt_all(&self, handlers: Vec<Handler>) -> Result<Vec<BoundHandler<S::Context>>> {
        let mut bound = Vec::with_capacity(handlers.len());
        let mut errors = Vec::new();
        for handler in handlers {
            match self.adapt(handler) {
                Ok(handler) => bound.push(handler),
                Err(err) => errors.push(err),
            }
        }
        DiError::collect(errors)?;
        Ok(bound)
    }

    /// Register a handler chain for a verb and path.
    ///
    /// Earlier handlers act as middleware for the last one. Nothing is
    /// registered if any handler fails to adapt.
    pub fn handle(&mut self, method: Method, path: &str, handlers: Vec<Handler>) -> Result<()> {
        let bound = self.adapt_all(handlers)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "handler_injector",
            method = %method,
            path = path,
            handlers = bound.len(),
            "Registering route"
        );

        self.sink.handle(method, path, bound);
        Ok(())
    }

    /// Register handlers that run for every request.
    pub fn use_middleware(&mut self, handlers: Vec<Handler>) -> Result<()> {
        let bound = self.adapt_all(handlers)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "handler_injector",
            handlers = bound.len(),
            "Registering middleware"
        );

        self.sink.use_middleware(bound);
        Ok(())
    }

    /// Register every route of a controller.
    ///
    /// All problems across the controller's routes, fields and middleware
    /// are reported together; nothing is registered unless all of them
    /// bind.
    pub fn register_controller<T: Controller>(&mut self, controller: T) -> Result<()> {
        let routes = bind_controller::<S::Context, T>(&self.registry, controller)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "handler_injector",
            controller = std::any::type_name::<T>(),
            routes = routes.len(),
            "Registering controller"
        );

        for route in routes {
            self.sink.handle(route.method, &route.path, vec![route.handler]);
        }
        Ok(())
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Resolve a value outside of any route, as a handler would see it.
    pub fn resolve<T: Injectable>(&self, ctx: &S::Context) -> Result<Arc<T>> {
        let values = ResolvedValues::new();
        let value = Resolver::new(&self.registry, &values)
            .with_seed(Self::context_key(), Arc::new(ctx.clone()))
            .resolve(TypeKey::of::<T>())?;

        value.downcast::<T>().map_err(|_| {
            DiError::Internal(format!(
                "registered value does not match type {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Check if a type is registered.
    #[inline]
    pub fn contains<T: Injectable>(&self) -> bool {
        self.registry.contains(&TypeKey::of::<T>())
    }

    /// Number of registered types, including the request context.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Always false: the request context is registered on creation.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    /// The underlying route sink
    #[inline]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The underlying route sink, mutably
    #[inline]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consume the injector, returning the route sink
    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: RouteSink + std::fmt::Debug> std::fmt::Debug for Injector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("sink", &self.sink)
            .field("services", &self.registry.len())
            .finish()
    }
}
