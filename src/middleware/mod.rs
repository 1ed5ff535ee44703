//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: structured tracing, metrics, request-id injection,
//! and authentication-header inspection.
//!
//! A middleware wraps the rest of the chain behind a [`Next`] value:
//!
//! ```rust
//! use trellis::{Middleware, Next, Request, Response};
//! use trellis::handler::BoxFuture;
//!
//! struct ServerHeader;
//!
//! impl Middleware for ServerHeader {
//!     fn handle(&self, req: Request, next: Next) -> BoxFuture {
//!         Box::pin(async move {
//!             next.run(req).await.with_header("server", "trellis")
//!         })
//!     }
//! }
//! ```
//!
//! Chains compose right-to-left: the first middleware in the combined
//! global + per-route list is the outermost — it sees the request first and
//! the response last.

mod trace;

pub use trace::Trace;

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

/// A request/response interceptor.
///
/// Call `next.run(req)` to continue down the chain, or return a response
/// without calling it to short-circuit.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

/// The remainder of the middleware chain, ending at the route handler.
#[derive(Clone)]
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    /// Passes the request to the next element of the chain.
    pub fn run(self, req: Request) -> BoxFuture {
        self.inner.call(req)
    }
}

/// One middleware layered over the rest of the chain.
struct Layered {
    middleware: Arc<dyn Middleware>,
    next: BoxedHandler,
}

impl ErasedHandler for Layered {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Next { inner: Arc::clone(&self.next) };
        self.middleware.handle(req, next)
    }
}

/// Wraps `handler` in `chain`, first element outermost.
///
/// Iterates in reverse so each middleware closes over everything inward of
/// it; the result is itself an erased handler and runs with no composition
/// work on the request path.
pub(crate) fn compose(chain: &[Arc<dyn Middleware>], handler: BoxedHandler) -> BoxedHandler {
    let mut current = handler;
    for middleware in chain.iter().rev() {
        current = Arc::new(Layered {
            middleware: Arc::clone(middleware),
            next: current,
        });
    }
    current
}
