//! Test fixtures shared by the unit tests

use crate::{BoundHandler, Context, Result, RouteSink};
use http::Method;

/// A registered chain
pub(crate) struct Route {
    pub method: Method,
    pub path: String,
    pub handlers: Vec<BoundHandler<Context>>,
}

/// Route sink that records every chain and can replay requests against them.
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub routes: Vec<Route>,
    pub middleware: Vec<BoundHandler<Context>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run global middleware and the chain registered for `method` and
    /// `path`. Returns `Ok(false)` when no route matches.
    pub fn dispatch(&self, method: Method, path: &str, ctx: &Context) -> Result<bool> {
        let Some(route) = self
            .routes
            .iter()
            .find(|r| r.method == method && r.path == path)
        else {
            return Ok(false);
        };

        for handler in self.middleware.iter().chain(&route.handlers) {
            handler.call(ctx)?;
        }
        Ok(true)
    }

    /// Dispatch with a fresh context
    pub fn request(&self, method: Method, path: &str) -> Result<bool> {
        self.dispatch(method, path, &Context::new())
    }
}

impl RouteSink for RecordingSink {
    type Context = Context;

    fn handle(&mut self, method: Method, path: &str, handlers: Vec<BoundHandler<Context>>) {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            handlers,
        });
    }

    fn use_middleware(&mut self, handlers: Vec<BoundHandler<Context>>) {
        self.middleware.extend(handlers);
    }
}
