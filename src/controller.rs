//! Controllers: structs whose methods serve routes
//!
//! A controller declares three things:
//!
//! - injectable fields, as `Option<T>` slots listed by [`InjectFields`]
//! - named request methods, listed by [`Controller::methods`]
//! - a route map from URL path to method name
//!
//! The value passed at registration is a prototype. Every request works on a
//! fresh clone whose empty slots are filled from the container; slots that
//! were already `Some` on the prototype keep their value.
//!
//! Each route is handed to the sink as a single bound handler running the
//! method's middleware and then the method itself, all within one
//! resolution pass.

use crate::handler::{BoundHandler, Handler, PassFn};
use crate::method::method_for_handler;
use crate::provider::{Injectable, TypeKey, Value, take};
use crate::registry::Registry;
use crate::resolve::Resolver;
use crate::scope::{RequestContext, ResolvedValues};
use crate::{DiError, Result};
use http::Method;
use std::collections::BTreeMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, error};

/// URL path to controller method name
pub type RouteMap = BTreeMap<String, String>;

/// Controller method name to the middleware handlers run before it
pub type MiddlewareMap = BTreeMap<String, Vec<Handler>>;

/// Declares a type's injectable fields.
///
/// Usually derived with `#[derive(Inject)]`; a manual implementation lists
/// each `Option<T>` slot:
///
/// ```rust
/// use handler_injector::{Fields, InjectFields};
///
/// #[derive(Clone)]
/// struct Database;
///
/// #[derive(Clone)]
/// struct UserController {
///     db: Option<Database>,
///     prefix: &'static str,
/// }
///
/// impl InjectFields for UserController {
///     fn inject_fields(fields: &mut Fields<Self>) {
///         fields.field("db", |c: &mut Self| &mut c.db);
///     }
/// }
/// ```
pub trait InjectFields: Sized + 'static {
    /// Register every injectable slot
    fn inject_fields(fields: &mut Fields<Self>);
}

/// A struct whose methods handle requests.
pub trait Controller: InjectFields + Clone + Send + Sync + 'static {
    /// Path to method name for every route this controller serves
    fn routes(&self) -> RouteMap;

    /// Register the methods named by [`Controller::routes`]
    fn methods(methods: &mut Methods<Self>);

    /// Middleware to run before particular methods
    fn middleware(&self) -> MiddlewareMap {
        MiddlewareMap::new()
    }
}

struct FieldSlot<C> {
    name: &'static str,
    key: TypeKey,
    is_set: Box<dyn Fn(&mut C) -> bool + Send + Sync>,
    fill: Box<dyn Fn(&mut C, &Value) -> Result<()> + Send + Sync>,
}

/// Collects a controller's injectable field slots.
pub struct Fields<C> {
    slots: Vec<FieldSlot<C>>,
}

impl<C: 'static> Fields<C> {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Declare an `Option<T>` field filled from the provider for `T`
    pub fn field<T, A>(&mut self, name: &'static str, slot: A) -> &mut Self
    where
        T: Injectable + Clone,
        A: Fn(&mut C) -> &mut Option<T> + Send + Sync + 'static,
    {
        let slot = Arc::new(slot);
        let probe = Arc::clone(&slot);

        self.slots.push(FieldSlot {
            name,
            key: TypeKey::of::<T>(),
            is_set: Box::new(move |controller: &mut C| probe(controller).is_some()),
            fill: Box::new(move |controller: &mut C, value: &Value| {
                *slot(controller) = Some(take::<T>(Some(value))?);
                Ok(())
            }),
        });
        self
    }

    /// Number of declared slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slots were declared
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

type MethodFn<C> = Arc<dyn Fn(&C, &[Value]) -> Result<()> + Send + Sync>;

/// A controller method with its parameter types.
pub struct ControllerMethod<C> {
    first: Option<TypeKey>,
    params: Vec<TypeKey>,
    call: MethodFn<C>,
}

impl<C> ControllerMethod<C> {
    fn from_parts(mut keys: Vec<TypeKey>, call: MethodFn<C>) -> Self {
        let first = if keys.is_empty() {
            None
        } else {
            Some(keys.remove(0))
        };
        Self {
            first,
            params: keys,
            call,
        }
    }

    /// Types injected after the leading context parameter
    pub fn params(&self) -> &[TypeKey] {
        &self.params
    }
}

impl<C> Clone for ControllerMethod<C> {
    fn clone(&self) -> Self {
        Self {
            first: self.first,
            params: self.params.clone(),
            call: Arc::clone(&self.call),
        }
    }
}

/// Collects a controller's named request methods.
pub struct Methods<C> {
    methods: BTreeMap<String, ControllerMethod<C>>,
}

impl<C> Methods<C> {
    fn new() -> Self {
        Self {
            methods: BTreeMap::new(),
        }
    }

    /// Register a method under the name used in [`Controller::routes`]
    pub fn method<Args, M>(&mut self, name: impl Into<String>, method: M) -> &mut Self
    where
        M: IntoControllerMethod<C, Args>,
    {
        self.methods
            .insert(name.into(), method.into_controller_method());
        self
    }

    /// Look up a registered method
    pub fn get(&self, name: &str) -> Option<&ControllerMethod<C>> {
        self.methods.get(name)
    }
}

/// Conversion from `Fn(&C, P0, .., Pn) -> R` into a [`ControllerMethod`].
///
/// Implemented for up to 12 parameters after the receiver. The return value
/// is ignored.
pub trait IntoControllerMethod<C, Args>: Send + Sync + 'static {
    /// Erase the method.
    fn into_controller_method(self) -> ControllerMethod<C>;
}

macro_rules! impl_into_controller_method {
    ($($P:ident),*) => {
        impl<Ctl, F, R, $($P,)*> IntoControllerMethod<Ctl, ($($P,)*)> for F
        where
            Ctl: 'static,
            F: Fn(&Ctl, $($P),*) -> R + Send + Sync + 'static,
            R: 'static,
            $($P: Injectable + Clone,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_controller_method(self) -> ControllerMethod<Ctl> {
                let keys = vec![$(TypeKey::of::<$P>()),*];
                let call: MethodFn<Ctl> = Arc::new(move |controller: &Ctl, args: &[Value]| {
                    let mut args = args.iter();
                    $(let $P = take::<$P>(args.next())?;)*
                    let _ = (self)(controller, $($P),*);
                    Ok(())
                });
                ControllerMethod::from_parts(keys, call)
            }
        }
    };
}

impl_into_controller_method!();
impl_into_controller_method!(A);
impl_into_controller_method!(A, B);
impl_into_controller_method!(A, B, C);
impl_into_controller_method!(A, B, C, D);
impl_into_controller_method!(A, B, C, D, E);
impl_into_controller_method!(A, B, C, D, E, G);
impl_into_controller_method!(A, B, C, D, E, G, H);
impl_into_controller_method!(A, B, C, D, E, G, H, I);
impl_into_controller_method!(A, B, C, D, E, G, H, I, J);
impl_into_controller_method!(A, B, C, D, E, G, H, I, J, K);
impl_into_controller_method!(A, B, C, D, E, G, H, I, J, K, L);
impl_into_controller_method!(A, B, C, D, E, G, H, I, J, K, L, M);

/// A route produced by binding a controller.
pub(crate) struct ControllerRoute<C> {
    pub method: Method,
    pub path: String,
    /// Middleware and target method, run in one resolution pass
    pub handler: BoundHandler<C>,
}

/// Validate a controller against the registry and bind every route.
///
/// All problems across routes, fields and middleware are reported together.
pub(crate) fn bind_controller<Ctx, T>(
    registry: &Arc<Registry>,
    controller: T,
) -> Result<Vec<ControllerRoute<Ctx>>>
where
    Ctx: RequestContext,
    T: Controller,
{
    let controller_name = std::any::type_name::<T>();
    let context = TypeKey::of::<Ctx>();
    let mut errors = Vec::new();

    let mut methods = Methods::new();
    T::methods(&mut methods);

    let mut fields = Fields::new();
    T::inject_fields(&mut fields);

    let mut probe = controller.clone();
    let mut pending = Vec::new();
    for slot in fields.slots {
        if (slot.is_set)(&mut probe) {
            #[cfg(feature = "logging")]
            debug!(
                target: "handler_injector",
                controller = controller_name,
                field = slot.name,
                "Controller field keeps its static value"
            );
            continue;
        }
        if !registry.contains(&slot.key) {
            errors.push(DiError::unknown_dependency(slot.key));
        }
        pending.push(slot);
    }
    let pending = Arc::new(pending);
    let prototype = Arc::new(controller);
    let middleware = prototype.middleware();

    let mut routes = Vec::new();
    for (path, method_name) in prototype.routes() {
        let Some(target) = methods.get(&method_name).cloned() else {
            errors.push(DiError::UnknownControllerMethod {
                controller: controller_name,
                method: method_name,
            });
            continue;
        };

        match target.first {
            Some(first) if first == context => {}
            first => {
                errors.push(DiError::InvalidControllerMethodSignature {
                    controller: controller_name,
                    method: method_name.clone(),
                    expected: context.name(),
                    found: first.map_or_else(|| "no parameters".to_string(), |k| k.name().to_string()),
                });
            }
        }
        errors.extend(
            target
                .params
                .iter()
                .filter(|key| !registry.contains(key))
                .map(|key| DiError::unknown_dependency(*key)),
        );

        let before = middleware.get(&method_name).cloned().unwrap_or_default();
        let mut chain = Vec::with_capacity(before.len());
        for handler in before {
            match handler.bind_in_pass::<Ctx>(registry) {
                Ok((_, bound)) => chain.push(bound),
                Err(err) => errors.push(err),
            }
        }

        let name: Arc<str> = Arc::from(format!("{controller_name}::{method_name}"));
        let target = bind_target(
            Arc::clone(registry),
            Arc::clone(&prototype),
            Arc::clone(&pending),
            target,
            Arc::clone(&name),
        );

        let verb = method_for_handler(&method_name);

        #[cfg(feature = "logging")]
        debug!(
            target: "handler_injector",
            controller = controller_name,
            method = %method_name,
            verb = %verb,
            path = %path,
            middleware = chain.len(),
            "Binding controller route"
        );

        routes.push(ControllerRoute {
            method: verb,
            path,
            handler: BoundHandler::from_fn(name, move |ctx: &Ctx| {
                run_chain(ctx, &chain, &target)
            }),
        });
    }

    DiError::collect(errors)?;
    Ok(routes)
}

/// Run middleware then the target within one pass.
///
/// Stops at the first error, or once a middleware handler cancels the
/// request. The pass is dropped when the chain returns.
fn run_chain<C: RequestContext>(ctx: &C, chain: &[PassFn<C>], target: &PassFn<C>) -> Result<()> {
    let pass = ResolvedValues::new();
    for handler in chain {
        handler(ctx, &pass)?;
        if ctx.is_cancelled() {
            return Ok(());
        }
    }
    target(ctx, &pass)
}

#[cfg_attr(not(feature = "logging"), allow(unused_variables))]
fn bind_target<Ctx, T>(
    registry: Arc<Registry>,
    prototype: Arc<T>,
    pending: Arc<Vec<FieldSlot<T>>>,
    target: ControllerMethod<T>,
    name: Arc<str>,
) -> PassFn<Ctx>
where
    Ctx: RequestContext,
    T: Controller,
{
    let context = TypeKey::of::<Ctx>();

    Arc::new(move |ctx: &Ctx, pass: &ResolvedValues| {
        let seed: Value = Arc::new(ctx.clone());
        let mut resolver = Resolver::new(&registry, pass).with_seed(context, Arc::clone(&seed));

        let result = invoke::<T>(&mut resolver, &prototype, &pending, &target, seed);

        #[cfg(feature = "logging")]
        if let Err(err) = &result {
            error!(
                target: "handler_injector",
                handler = %name,
                scope = pass.scope().id(),
                error = %err,
                "Controller method failed"
            );
        }
        result
    })
}

fn invoke<T: Controller>(
    resolver: &mut Resolver<'_>,
    prototype: &T,
    pending: &[FieldSlot<T>],
    target: &ControllerMethod<T>,
    seed: Value,
) -> Result<()> {
    let mut instance = prototype.clone();
    for slot in pending {
        let value = resolver.resolve(slot.key)?;
        (slot.fill)(&mut instance, &value)?;
    }

    let mut args = resolver.resolve_all(&target.params)?;
    args.insert(0, seed);
    (target.call)(&instance, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use crate::provider::Provider;
    use crate::{Context, RequestContext};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct Greeting(String);

    #[derive(Clone, Debug, PartialEq)]
    struct RequestId(u32);

    #[derive(Clone)]
    struct Missing;

    #[derive(Clone)]
    struct GreetController {
        greeting: Option<Greeting>,
        seen: Arc<Mutex<Vec<(String, u32)>>>,
    }

    impl InjectFields for GreetController {
        fn inject_fields(fields: &mut Fields<Self>) {
            fields.field("greeting", |c: &mut Self| &mut c.greeting);
        }
    }

    impl GreetController {
        fn get_greet(&self, _ctx: Context, id: RequestId) {
            let greeting = self.greeting.clone().map(|g| g.0).unwrap_or_default();
            self.seen.lock().unwrap().push((greeting, id.0));
        }

        fn post_wrong(&self, _id: RequestId) {}
    }

    impl Controller for GreetController {
        fn routes(&self) -> RouteMap {
            RouteMap::from([("/greet".to_string(), "GetGreet".to_string())])
        }

        fn methods(methods: &mut Methods<Self>) {
            methods
                .method("GetGreet", Self::get_greet)
                .method("PostWrong", Self::post_wrong);
        }
    }

    fn registry(ids: &'static AtomicU32) -> Arc<Registry> {
        let registry = Registry::new();
        registry.insert(TypeKey::of::<Context>(), Factory::RequestScope);
        registry
            .register_all(
                vec![
                    Provider::new(|| Greeting("from provider".into())),
                    Provider::new(move || RequestId(ids.fetch_add(1, Ordering::SeqCst))),
                ],
                TypeKey::of::<Context>(),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn controller(greeting: Option<Greeting>) -> GreetController {
        GreetController {
            greeting,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[test]
    fn test_empty_field_is_injected() {
        static IDS: AtomicU32 = AtomicU32::new(0);
        let ctrl = controller(None);
        let seen = Arc::clone(&ctrl.seen);

        let routes = bind_controller::<Context, _>(&registry(&IDS), ctrl).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, Method::GET);
        assert_eq!(routes[0].path, "/greet");

        routes[0].handler.call(&Context::new()).unwrap();
        assert_eq!(seen.lock().unwrap()[0].0, "from provider");
    }

    #[test]
    fn test_preset_field_is_kept() {
        static IDS: AtomicU32 = AtomicU32::new(0);
        let ctrl = controller(Some(Greeting("static".into())));
        let seen = Arc::clone(&ctrl.seen);

        let routes = bind_controller::<Context, _>(&registry(&IDS), ctrl).unwrap();
        routes[0].handler.call(&Context::new()).unwrap();
        routes[0].handler.call(&Context::new()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], ("static".to_string(), 0));
        assert_eq!(seen[1], ("static".to_string(), 1));
    }

    #[derive(Clone)]
    struct BrokenController;

    impl InjectFields for BrokenController {
        fn inject_fields(_: &mut Fields<Self>) {}
    }

    impl BrokenController {
        fn get_missing(&self, _ctx: Context, _m: Missing) {}
        fn post_wrong(&self, _id: RequestId) {}
        fn put_nothing(&self) {}
    }

    impl Controller for BrokenController {
        fn routes(&self) -> RouteMap {
            RouteMap::from([
                ("/a".to_string(), "Unknown".to_string()),
                ("/b".to_string(), "PostWrong".to_string()),
                ("/c".to_string(), "PutNothing".to_string()),
                ("/d".to_string(), "GetMissing".to_string()),
            ])
        }

        fn methods(methods: &mut Methods<Self>) {
            methods
                .method("GetMissing", Self::get_missing)
                .method("PostWrong", Self::post_wrong)
                .method("PutNothing", Self::put_nothing);
        }
    }

    #[test]
    fn test_errors_are_aggregated() {
        static IDS: AtomicU32 = AtomicU32::new(0);
        let err = bind_controller::<Context, _>(&registry(&IDS), BrokenController)
            .err()
            .unwrap();

        let errors: Vec<&DiError> = err.iter().collect();
        assert_eq!(errors.len(), 4);
        assert!(matches!(
            errors[0],
            DiError::UnknownControllerMethod { method, .. } if method == "Unknown"
        ));
        assert!(matches!(
            errors[1],
            DiError::InvalidControllerMethodSignature { found, .. } if found.ends_with("RequestId")
        ));
        assert!(matches!(
            errors[2],
            DiError::InvalidControllerMethodSignature { found, .. } if found == "no parameters"
        ));
        assert!(matches!(errors[3], DiError::UnknownDependency { .. }));
    }

    #[test]
    fn test_unregistered_field_type() {
        #[derive(Clone)]
        struct NeedsMissing {
            missing: Option<Missing>,
        }

        impl InjectFields for NeedsMissing {
            fn inject_fields(fields: &mut Fields<Self>) {
                fields.field("missing", |c: &mut Self| &mut c.missing);
            }
        }

        impl Controller for NeedsMissing {
            fn routes(&self) -> RouteMap {
                RouteMap::new()
            }

            fn methods(_: &mut Methods<Self>) {}
        }

        static IDS: AtomicU32 = AtomicU32::new(0);
        let err = bind_controller::<Context, _>(&registry(&IDS), NeedsMissing { missing: None })
            .err()
            .unwrap();
        assert!(matches!(err, DiError::UnknownDependency { .. }));

        let ok = bind_controller::<Context, _>(
            &registry(&IDS),
            NeedsMissing {
                missing: Some(Missing),
            },
        );
        assert!(ok.is_ok());
    }

    #[derive(Clone)]
    struct ChainController {
        seen: Arc<Mutex<Vec<u32>>>,
    }

    impl InjectFields for ChainController {
        fn inject_fields(_: &mut Fields<Self>) {}
    }

    impl ChainController {
        fn delete_item(&self, _ctx: Context, id: RequestId) {
            self.seen.lock().unwrap().push(id.0);
        }
    }

    impl Controller for ChainController {
        fn routes(&self) -> RouteMap {
            RouteMap::from([("/item".to_string(), "DeleteItem".to_string())])
        }

        fn methods(methods: &mut Methods<Self>) {
            methods.method("DeleteItem", Self::delete_item);
        }

        fn middleware(&self) -> MiddlewareMap {
            let seen = Arc::clone(&self.seen);
            MiddlewareMap::from([(
                "DeleteItem".to_string(),
                vec![Handler::new(move |_ctx: Context, id: RequestId| {
                    seen.lock().unwrap().push(id.0);
                })],
            )])
        }
    }

    #[test]
    fn test_middleware_shares_values_with_target() {
        static IDS: AtomicU32 = AtomicU32::new(10);
        let ctrl = ChainController {
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let seen = Arc::clone(&ctrl.seen);

        let routes = bind_controller::<Context, _>(&registry(&IDS), ctrl).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].method, Method::DELETE);
        assert_eq!(
            routes[0].handler.name(),
            format!("{}::DeleteItem", std::any::type_name::<ChainController>())
        );

        for _ in 0..2 {
            routes[0].handler.call(&Context::new()).unwrap();
        }

        assert_eq!(*seen.lock().unwrap(), vec![10, 10, 11, 11]);
    }

    #[test]
    fn test_cancelled_chain_releases_request_values() {
        static LIVE: AtomicUsize = AtomicUsize::new(0);

        // Holds the context, so a value kept past the request would never be freed
        struct Session {
            _ctx: Context,
        }

        impl Session {
            fn new(ctx: Context) -> Self {
                LIVE.fetch_add(1, Ordering::SeqCst);
                Self { _ctx: ctx }
            }
        }

        impl Clone for Session {
            fn clone(&self) -> Self {
                Self::new(self._ctx.clone())
            }
        }

        impl Drop for Session {
            fn drop(&mut self) {
                LIVE.fetch_sub(1, Ordering::SeqCst);
            }
        }

        #[derive(Clone)]
        struct GuardedController {
            reached: Arc<AtomicBool>,
        }

        impl InjectFields for GuardedController {
            fn inject_fields(_: &mut Fields<Self>) {}
        }

        impl GuardedController {
            fn get_me(&self, _ctx: Context, _session: Session) {
                self.reached.store(true, Ordering::SeqCst);
            }
        }

        impl Controller for GuardedController {
            fn routes(&self) -> RouteMap {
                RouteMap::from([("/me".to_string(), "GetMe".to_string())])
            }

            fn methods(methods: &mut Methods<Self>) {
                methods.method("GetMe", Self::get_me);
            }

            fn middleware(&self) -> MiddlewareMap {
                MiddlewareMap::from([(
                    "GetMe".to_string(),
                    vec![Handler::new(|ctx: Context, _session: Session| ctx.cancel())],
                )])
            }
        }

        let registry = Registry::new();
        registry.insert(TypeKey::of::<Context>(), Factory::RequestScope);
        registry
            .register_all(
                vec![Provider::new(Session::new)],
                TypeKey::of::<Context>(),
            )
            .unwrap();
        let registry = Arc::new(registry);

        let reached = Arc::new(AtomicBool::new(false));
        let routes = bind_controller::<Context, _>(
            &registry,
            GuardedController {
                reached: Arc::clone(&reached),
            },
        )
        .unwrap();

        let ctx = Context::new();
        routes[0].handler.call(&ctx).unwrap();

        assert!(ctx.is_cancelled());
        assert!(!reached.load(Ordering::SeqCst));
        assert_eq!(LIVE.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_middleware_error_stops_chain() {
        #[derive(Clone)]
        struct Token;

        #[derive(Clone)]
        struct StrictController {
            reached: Arc<AtomicBool>,
        }

        impl InjectFields for StrictController {
            fn inject_fields(_: &mut Fields<Self>) {}
        }

        impl StrictController {
            fn get_secret(&self, _ctx: Context) {
                self.reached.store(true, Ordering::SeqCst);
            }
        }

        impl Controller for StrictController {
            fn routes(&self) -> RouteMap {
                RouteMap::from([("/secret".to_string(), "GetSecret".to_string())])
            }

            fn methods(methods: &mut Methods<Self>) {
                methods.method("GetSecret", Self::get_secret);
            }

            fn middleware(&self) -> MiddlewareMap {
                MiddlewareMap::from([(
                    "GetSecret".to_string(),
                    vec![Handler::new(|_ctx: Context, _token: Token| ())],
                )])
            }
        }

        let registry = Registry::new();
        registry.insert(TypeKey::of::<Context>(), Factory::RequestScope);
        registry
            .register_all(
                vec![Provider::from_raw(vec![], vec![TypeKey::of::<Token>()], |_| {
                    Err(DiError::Internal("no token".into()))
                })],
                TypeKey::of::<Context>(),
            )
            .unwrap();

        let reached = Arc::new(AtomicBool::new(false));
        let routes = bind_controller::<Context, _>(
            &Arc::new(registry),
            StrictController {
                reached: Arc::clone(&reached),
            },
        )
        .unwrap();

        let err = routes[0].handler.call(&Context::new()).unwrap_err();
        assert!(matches!(err, DiError::Internal(_)));
        assert!(!reached.load(Ordering::SeqCst));
    }

    /// Context whose clones copy their storage instead of sharing it
    #[derive(Default)]
    struct CopyingContext {
        values: Mutex<HashMap<String, Value>>,
        cancelled: AtomicBool,
    }

    impl Clone for CopyingContext {
        fn clone(&self) -> Self {
            Self {
                values: Mutex::new(self.values.lock().unwrap().clone()),
                cancelled: AtomicBool::new(self.cancelled.load(Ordering::SeqCst)),
            }
        }
    }

    impl RequestContext for CopyingContext {
        fn value(&self, key: &str) -> Option<Value> {
            self.values.lock().unwrap().get(key).cloned()
        }

        fn set_value(&self, key: &str, value: Value) {
            self.values.lock().unwrap().insert(key.to_string(), value);
        }

        fn remove_value(&self, key: &str) -> Option<Value> {
            self.values.lock().unwrap().remove(key)
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }
    }

    #[derive(Clone)]
    struct CopyingController {
        seen: Arc<Mutex<Vec<u32>>>,
    }

    impl InjectFields for CopyingController {
        fn inject_fields(_: &mut Fields<Self>) {}
    }

    impl CopyingController {
        fn put_item(&self, _ctx: CopyingContext, id: RequestId) {
            self.seen.lock().unwrap().push(id.0);
        }
    }

    impl Controller for CopyingController {
        fn routes(&self) -> RouteMap {
            RouteMap::from([("/item".to_string(), "PutItem".to_string())])
        }

        fn methods(methods: &mut Methods<Self>) {
            methods.method("PutItem", Self::put_item);
        }

        fn middleware(&self) -> MiddlewareMap {
            let first = Arc::clone(&self.seen);
            let second = Arc::clone(&self.seen);
            MiddlewareMap::from([(
                "PutItem".to_string(),
                vec![
                    Handler::new(move |_ctx: CopyingContext, id: RequestId| {
                        first.lock().unwrap().push(id.0);
                    }),
                    Handler::new(move |_ctx: CopyingContext, id: RequestId| {
                        second.lock().unwrap().push(id.0);
                    }),
                ],
            )])
        }
    }

    #[test]
    fn test_chain_sharing_does_not_depend_on_context_clones() {
        static IDS: AtomicU32 = AtomicU32::new(0);

        let registry = Registry::new();
        registry.insert(TypeKey::of::<CopyingContext>(), Factory::RequestScope);
        registry
            .register_all(
                vec![Provider::new(|| RequestId(IDS.fetch_add(1, Ordering::SeqCst)))],
                TypeKey::of::<CopyingContext>(),
            )
            .unwrap();

        let ctrl = CopyingController {
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let seen = Arc::clone(&ctrl.seen);
        let routes = bind_controller::<CopyingContext, _>(&Arc::new(registry), ctrl).unwrap();
        assert_eq!(routes[0].method, Method::PUT);

        routes[0].handler.call(&CopyingContext::default()).unwrap();
        routes[0].handler.call(&CopyingContext::default()).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0, 0, 0, 1, 1, 1]);
    }
}
