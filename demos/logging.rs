//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use handler_injector::{BoundHandler, Context, Handler, Injector, Method, Provider, RouteSink};

/// Router that only keeps chains around
#[derive(Default)]
struct Router {
    chains: Vec<Vec<BoundHandler<Context>>>,
}

impl RouteSink for Router {
    type Context = Context;

    fn handle(&mut self, _: Method, _: &str, handlers: Vec<BoundHandler<Context>>) {
        self.chains.push(handlers);
    }

    fn use_middleware(&mut self, handlers: Vec<BoundHandler<Context>>) {
        self.chains.push(handlers);
    }
}

// Example services
#[allow(dead_code)]
#[derive(Clone)]
struct Config {
    url: String,
}

#[allow(dead_code)]
#[derive(Clone)]
struct Database {
    url: String,
}

#[allow(dead_code)]
#[derive(Clone)]
struct Mailer;

fn main() {
    // Initialize logging - uses JSON if logging-json feature enabled,
    // pretty if logging-pretty enabled
    handler_injector::logging::builder().trace().injector_only().init();

    println!("=== Handler Injector Logging Demo ===\n");

    let mut injector = Injector::new(Router::default());

    // Registration (logs: "Registering provider" at debug)
    injector
        .register_providers([
            Provider::singleton(|config: Config| Database { url: config.url }),
            Provider::new(|| Config {
                url: "postgres://localhost/mydb".into(),
            }),
        ])
        .unwrap();

    // Route registration (logs: "Registering route")
    injector
        .handle(
            Method::GET,
            "/users",
            vec![Handler::new(|_: Context, db: Database| {
                println!("  [App] handling with {}", db.url);
            })],
        )
        .unwrap();

    // Missing dependency is rejected up front
    let err = injector
        .handle(
            Method::POST,
            "/mail",
            vec![Handler::new(|_: Context, _: Mailer| {})],
        )
        .unwrap_err();
    println!("  [App] rejected route: {err}");

    // Requests (logs: "Resolving" at trace)
    for chain in &injector.sink().chains {
        for handler in chain {
            handler.call(&Context::new()).unwrap();
        }
    }

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
