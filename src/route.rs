//! Route definitions and their prepared, servable form.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::{BoxedHandler, HandlerRef};
use crate::method::Method;
use crate::middleware::Middleware;

/// One route definition.
///
/// Created by [`Routes::add`](crate::Routes::add), which returns `&mut Route`
/// so the definition can be refined fluently before the table is built:
///
/// ```rust,no_run
/// # use trellis::{HandlerRef, Method, Routes};
/// # fn define(r: &mut Routes) {
/// r.add("", Method::Get, "/users/{id}", HandlerRef::named("users.show"))
///     .name("user.show")
///     .pattern("id", "[0-9]+")
///     .middleware("auth");
/// # }
/// ```
///
/// Once the router is built the definition is frozen; there is no mutation
/// API afterwards.
pub struct Route {
    pub(crate) handler: HandlerRef,
    pub(crate) middleware: Vec<String>,
    pub(crate) patterns: HashMap<String, String>,
    pub(crate) name: Option<String>,
    pub(crate) api: Option<serde_json::Value>,
}

impl Route {
    pub(crate) fn new(handler: HandlerRef) -> Self {
        Self {
            handler,
            middleware: Vec::new(),
            patterns: HashMap::new(),
            name: None,
            api: None,
        }
    }

    /// Names the route for URL generation via
    /// [`Router::url`](crate::Router::url). Last registration wins on a
    /// name collision.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a middleware reference, resolved through the configured
    /// [`Resolver`](crate::Resolver) at build time. Runs in append order,
    /// inside the global middleware.
    pub fn middleware(&mut self, name: impl Into<String>) -> &mut Self {
        self.middleware.push(name.into());
        self
    }

    /// Overrides the regex for one path parameter. The default is `[^/]+`.
    pub fn pattern(&mut self, param: &str, regex: &str) -> &mut Self {
        self.patterns.insert(param.to_owned(), regex.to_owned());
        self
    }

    /// Attaches an API-doc fragment, emitted by
    /// [`Router::openapi`](crate::Router::openapi).
    pub fn api(&mut self, doc: serde_json::Value) -> &mut Self {
        self.api = Some(doc);
        self
    }

    /// The route's name, if one was set.
    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// One entry recorded by the definition callback, in registration order.
/// This is exactly what the route cache persists.
pub(crate) struct Registration {
    pub(crate) domain: String,
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) fallback: bool,
    pub(crate) route: Route,
}

/// A route prepared for serving: the definition plus its resolved handler,
/// wrapped in the fully composed middleware pipeline. Built once; the
/// request path only clones the `Arc` and calls the pipeline.
pub(crate) struct Endpoint {
    pub(crate) route: Arc<Route>,
    pub(crate) pipeline: BoxedHandler,
}

impl Endpoint {
    pub(crate) fn new(
        route: Arc<Route>,
        handler: BoxedHandler,
        chain: &[Arc<dyn Middleware>],
    ) -> Self {
        let pipeline = crate::middleware::compose(chain, handler);
        Self { route, pipeline }
    }
}
