//! # Handler Injector - Type-Directed Dependency Injection for HTTP Handlers
//!
//! Register constructor functions once, then write request handlers and
//! controllers that simply declare the values they need. The injector
//! validates every dependency when a route is registered and resolves them
//! per request.
//!
//! ## Features
//!
//! - 🔍 **Type-directed** - Values are matched by type, no names or annotations
//! - ✅ **Checked up front** - Unknown dependencies fail at registration, not mid-request
//! - 🔀 **Order-free batches** - Providers may be registered in any order within a batch
//! - ♻️ **Per-request values** - Every request gets fresh transient values, built once per request
//! - 🏭 **Singletons** - Computed once per injector, even under concurrent first use
//! - 🎛️ **Controllers** - Struct fields and method parameters injected per request
//! - 🧭 **Router-agnostic** - Adapted chains are handed to any [`RouteSink`]
//! - 📊 **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use handler_injector::{BoundHandler, Context, Handler, Injector, Provider, RouteSink};
//! use http::Method;
//!
//! // The router side: receives adapted chains
//! #[derive(Default)]
//! struct Router {
//!     routes: Vec<(Method, String, Vec<BoundHandler<Context>>)>,
//! }
//!
//! impl RouteSink for Router {
//!     type Context = Context;
//!
//!     fn handle(&mut self, method: Method, path: &str, handlers: Vec<BoundHandler<Context>>) {
//!         self.routes.push((method, path.to_string(), handlers));
//!     }
//!
//!     fn use_middleware(&mut self, _: Vec<BoundHandler<Context>>) {}
//! }
//!
//! #[derive(Clone)]
//! struct Config { url: String }
//!
//! #[derive(Clone)]
//! struct Database { url: String }
//!
//! let mut injector = Injector::new(Router::default());
//!
//! // Providers may be listed in any order
//! injector
//!     .register_providers([
//!         Provider::singleton(|config: Config| Database { url: config.url }),
//!         Provider::new(|| Config { url: "postgres://localhost".into() }),
//!     ])
//!     .unwrap();
//!
//! // The first parameter is always the request context
//! injector
//!     .handle(
//!         Method::GET,
//!         "/users",
//!         vec![Handler::new(|_ctx: Context, db: Database| {
//!             assert_eq!(db.url, "postgres://localhost");
//!         })],
//!     )
//!     .unwrap();
//!
//! // The router calls each bound handler with the request's context
//! let (_, _, chain) = &injector.sink().routes[0];
//! chain[0].call(&Context::new()).unwrap();
//! ```
//!
//! ## Controllers
//!
//! ```rust
//! use handler_injector::{Context, Controller, Fields, InjectFields, Methods, RouteMap};
//!
//! #[derive(Clone)]
//! struct Database;
//!
//! #[derive(Clone)]
//! struct UserController {
//!     // Filled from the Database provider on every request
//!     db: Option<Database>,
//! }
//!
//! impl InjectFields for UserController {
//!     fn inject_fields(fields: &mut Fields<Self>) {
//!         fields.field("db", |c: &mut Self| &mut c.db);
//!     }
//! }
//!
//! impl UserController {
//!     fn get_users(&self, _ctx: Context) {}
//!     fn post_create_user(&self, _ctx: Context, _db: Database) {}
//! }
//!
//! impl Controller for UserController {
//!     fn routes(&self) -> RouteMap {
//!         RouteMap::from([
//!             ("/users".to_string(), "GetUsers".to_string()),
//!             ("/users/new".to_string(), "PostCreateUser".to_string()),
//!         ])
//!     }
//!
//!     fn methods(methods: &mut Methods<Self>) {
//!         methods
//!             .method("GetUsers", Self::get_users)
//!             .method("PostCreateUser", Self::post_create_user);
//!     }
//! }
//! ```
//!
//! The verb of each route comes from the method name's first word, so
//! `PostCreateUser` is served on `POST` (see [`method_for_handler`]).

// Generated code refers to `::handler_injector`, including inside this crate
extern crate self as handler_injector;

mod context;
mod controller;
mod error;
mod factory;
mod handler;
mod injector;
#[cfg(feature = "logging")]
pub mod logging;
mod method;
mod provider;
mod registry;
mod resolve;
mod scope;
mod sink;

#[cfg(test)]
mod test_support;

pub use context::Context;
pub use controller::{
    Controller, ControllerMethod, Fields, InjectFields, IntoControllerMethod, Methods,
    MiddlewareMap, RouteMap,
};
pub use error::{DiError, Result};
pub use handler::{BoundHandler, Handler, IntoHandler};
pub use injector::Injector;
pub use method::{HTTP_METHODS, method_for_handler};
pub use provider::{Injectable, IntoProvider, Lifetime, Provider, ProviderFn, TypeKey, Value};
pub use scope::{RequestContext, Scope};
pub use sink::RouteSink;

#[cfg(feature = "derive")]
pub use handler_injector_derive::Inject;

// Re-export for convenience
pub use http::Method;
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BoundHandler, Context, Controller, DiError, Fields, Handler, InjectFields, Injectable,
        Injector, Lifetime, Method, Methods, MiddlewareMap, Provider, RequestContext, Result,
        RouteMap, RouteSink,
    };
    #[cfg(feature = "derive")]
    pub use crate::Inject;
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Database {
        url: String,
    }

    #[derive(Clone)]
    struct Repo {
        db: Arc<Database>,
    }

    #[test]
    fn test_arc_parameters_share_the_resolved_instance() {
        let mut injector = Injector::new(RecordingSink::new());
        injector
            .register_providers([
                Provider::singleton(|| Arc::new(Database { url: "test".into() })),
                Provider::new(|db: Arc<Database>| Repo { db }),
            ])
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let slot = Arc::clone(&seen);
        injector
            .handle(
                Method::GET,
                "/repo",
                vec![Handler::new(move |_: Context, repo: Repo, db: Arc<Database>| {
                    slot.lock().unwrap().push(Arc::ptr_eq(&repo.db, &db));
                    assert_eq!(db.url, "test");
                })],
            )
            .unwrap();

        injector.sink().request(Method::GET, "/repo").unwrap();
        injector.sink().request(Method::GET, "/repo").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![true, true]);
    }

    #[test]
    fn test_request_failure_is_isolated() {
        #[derive(Clone)]
        struct Token(String);

        let mut injector = Injector::new(RecordingSink::new());
        injector
            .register_providers([Provider::from_raw(
                vec![TypeKey::of::<Context>()],
                vec![TypeKey::of::<Token>()],
                |args| {
                    args.first()
                        .and_then(|ctx| ctx.downcast_ref::<Context>())
                        .and_then(|ctx| ctx.value("token"))
                        .and_then(|v| v.downcast::<String>().ok())
                        .map(|t| Arc::new(Token(t.as_str().to_string())) as Value)
                        .ok_or_else(|| DiError::Internal("missing token".into()))
                },
            )])
            .unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let slot = Arc::clone(&seen);
        injector
            .handle(
                Method::GET,
                "/secure",
                vec![Handler::new(move |_: Context, token: Token| {
                    slot.lock().unwrap().push(token.0);
                })],
            )
            .unwrap();

        let sink = injector.sink();
        let authed = Context::new().with_value("token", Arc::new(String::from("abc")));
        assert!(sink.dispatch(Method::GET, "/secure", &authed).unwrap());
        assert!(matches!(
            sink.request(Method::GET, "/secure"),
            Err(DiError::Internal(_))
        ));
        assert!(sink.dispatch(Method::GET, "/secure", &authed).unwrap());

        assert_eq!(*seen.lock().unwrap(), vec!["abc", "abc"]);
    }

    #[cfg(feature = "derive")]
    #[test]
    fn test_derived_fields() {
        #[derive(Clone, Inject)]
        struct Greeter {
            #[inject]
            db: Option<Database>,
            #[inject]
            name: Option<String>,
            calls: Arc<Mutex<u32>>,
        }

        let mut fields = Fields::<Greeter>::new();
        Greeter::inject_fields(&mut fields);
        assert_eq!(fields.len(), 2);

        let _ = Greeter {
            db: None,
            name: None,
            calls: Arc::new(Mutex::new(0)),
        };
    }
}
