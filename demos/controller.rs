//! Example demonstrating controllers with #[derive(Inject)]
//!
//! Run with:
//!   cargo run --example controller --features derive

use handler_injector::{
    BoundHandler, Context, Controller, Handler, Inject, Injector, Method, MiddlewareMap,
    Methods, Provider, RequestContext, RouteMap, RouteSink,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A tiny router: exact path match, middleware first
#[derive(Default)]
struct Router {
    routes: Vec<(Method, String, Vec<BoundHandler<Context>>)>,
}

impl Router {
    fn serve(&self, method: Method, path: &str, ctx: &Context) {
        let Some((_, _, chain)) = self
            .routes
            .iter()
            .find(|(m, p, _)| *m == method && p == path)
        else {
            println!("  404 {method} {path}");
            return;
        };

        for handler in chain {
            if let Err(err) = handler.call(ctx) {
                println!("  500 {method} {path}: {err}");
                return;
            }
        }
    }
}

impl RouteSink for Router {
    type Context = Context;

    fn handle(&mut self, method: Method, path: &str, handlers: Vec<BoundHandler<Context>>) {
        println!("  mounted {method} {path} ({} handlers)", handlers.len());
        self.routes.push((method, path.to_string(), handlers));
    }

    fn use_middleware(&mut self, _: Vec<BoundHandler<Context>>) {}
}

// Dependencies
#[allow(dead_code)]
#[derive(Clone)]
struct Database {
    url: String,
}

#[derive(Clone, Debug)]
struct RequestId(u64);

#[derive(Clone)]
struct User(String);

// Controller with one injected field and one configured field
#[derive(Clone, Inject)]
struct UserController {
    #[inject]
    db: Option<Database>,
    greeting: &'static str,
}

impl UserController {
    fn get_user(&self, ctx: Context, id: RequestId) {
        let user = ctx
            .value("user")
            .and_then(|v| v.downcast::<User>().ok())
            .map_or_else(|| "anonymous".to_string(), |u| u.0.clone());
        let url = self.db.as_ref().map_or("<none>", |db| db.url.as_str());
        println!("  [{id:?}] {} {user} from {url}", self.greeting);
    }

    fn post_create_user(&self, _ctx: Context, id: RequestId) {
        println!("  [{id:?}] creating user");
    }
}

impl Controller for UserController {
    fn routes(&self) -> RouteMap {
        RouteMap::from([
            ("/user".to_string(), "GetUser".to_string()),
            ("/users".to_string(), "PostCreateUser".to_string()),
        ])
    }

    fn methods(methods: &mut Methods<Self>) {
        methods
            .method("GetUser", Self::get_user)
            .method("PostCreateUser", Self::post_create_user);
    }

    fn middleware(&self) -> MiddlewareMap {
        // The request id seen here is the one the method receives
        let authenticate = Handler::new(|ctx: Context, id: RequestId| {
            println!("  [{id:?}] authenticating");
            ctx.set_value("user", Arc::new(User("alice".into())));
        })
        .with_name("authenticate");

        MiddlewareMap::from([("GetUser".to_string(), vec![authenticate])])
    }
}

fn main() {
    println!("=== Controller Demo ===\n");

    let counter = Arc::new(AtomicU64::new(0));
    let next = Arc::clone(&counter);

    let mut injector = Injector::new(Router::default());
    injector
        .register_providers([
            Provider::new(move || RequestId(next.fetch_add(1, Ordering::SeqCst))),
            Provider::singleton(|| Database {
                url: "postgres://localhost/app".into(),
            }),
        ])
        .unwrap();

    println!("Registering controller:");
    injector
        .register_controller(UserController {
            db: None,
            greeting: "hello",
        })
        .unwrap();

    println!("\nServing requests:");
    let router = injector.sink();
    router.serve(Method::GET, "/user", &Context::new());
    router.serve(Method::POST, "/users", &Context::new());
    router.serve(Method::GET, "/users", &Context::new());

    println!("\nRequest ids issued: {}", counter.load(Ordering::SeqCst));
    println!("\n=== Demo Complete ===");
}
