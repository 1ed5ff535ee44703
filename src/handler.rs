//! Handler trait, type erasure, and handler references.
//!
//! The routing table holds handlers of *different* concrete types in one
//! structure, so handlers are stored as trait objects (`dyn ErasedHandler`)
//! behind an `Arc`. The only per-request cost is one Arc clone plus one
//! virtual call.
//!
//! A route definition does not hold a handler directly — it holds a
//! [`HandlerRef`]: either an inline function (already erased) or the *name*
//! of a handler that an external [`Resolver`] constructs at build time. The
//! named form is what survives a round-trip through the route cache.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// signature of the public [`Middleware`] trait.
#[doc(hidden)]
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Handler references ────────────────────────────────────────────────────────

/// A reference to a route's handler, recorded at definition time.
///
/// `Named` is resolved through the configured [`Resolver`] when the table is
/// built; it is the only form that can be persisted in the route cache.
/// `Inline` wraps a function directly — convenient, but a table containing
/// inline handlers is never written to the cache (closures do not serialize
/// across processes).
#[derive(Clone)]
pub enum HandlerRef {
    Named(String),
    Inline(BoxedHandler),
}

impl HandlerRef {
    /// A handler identified by name, constructed by the [`Resolver`].
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// An inline function handler.
    pub fn inline(handler: impl Handler) -> Self {
        Self::Inline(handler.into_boxed_handler())
    }
}

// ── Resolver seam ─────────────────────────────────────────────────────────────

/// The boundary to an external service locator.
///
/// The router never constructs named handlers or middleware itself; it asks
/// the resolver once, while the table is built. A resolution failure there
/// aborts startup — it is a configuration error, not a request-time
/// condition.
pub trait Resolver: Send + Sync {
    /// Constructs the handler registered under `name`.
    fn handler(&self, name: &str) -> Result<BoxedHandler, Error>;

    /// Constructs the middleware registered under `name`.
    fn middleware(&self, name: &str) -> Result<Arc<dyn Middleware>, Error> {
        Err(Error::UnknownMiddleware(name.to_owned()))
    }
}
