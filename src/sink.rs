//! Route sink contract
//!
//! The injector never routes requests itself. It adapts handlers and hands
//! the resulting chains to a [`RouteSink`], typically a thin wrapper around
//! the application's router.

use crate::handler::BoundHandler;
use crate::scope::RequestContext;
use http::Method;

/// Destination for adapted handler chains.
///
/// For each request the sink calls every [`BoundHandler::call`] of the
/// matching chain in order, passing the same context to each.
pub trait RouteSink {
    /// Request-scope value passed to every handler
    type Context: RequestContext;

    /// Register a chain for a verb and path
    fn handle(&mut self, method: Method, path: &str, handlers: Vec<BoundHandler<Self::Context>>);

    /// Register a chain that runs for every request
    fn use_middleware(&mut self, handlers: Vec<BoundHandler<Self::Context>>);
}
