//! Hook points around route matching.
//!
//! Two punctual hooks, both synchronous and optional. `before_match` runs
//! before the routing tree is consulted and may rewrite the request or stop
//! the pipeline (the router answers 403). `after_match` runs unconditionally
//! after matching, whether or not a route was found — the place to log 404s
//! or record match metrics.

use std::sync::Arc;

use crate::request::{Params, Request};
use crate::route::Route;

/// Verdict of the pre-match hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
    /// Proceed with routing.
    Continue,
    /// Stop: the router short-circuits with `403 Forbidden`.
    Stop,
}

/// Observer of the two match hook points. All methods default to no-ops.
pub trait Hooks: Send + Sync {
    /// Called before matching. The request may be modified in place.
    fn before_match(&self, _req: &mut Request) -> Flow {
        Flow::Continue
    }

    /// Called after matching with the matched route (or `None`) and the
    /// captured parameters.
    fn after_match(&self, _req: &Request, _route: Option<&Arc<Route>>, _params: &Params) {}
}
