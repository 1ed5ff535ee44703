//! Table construction, request orchestration, and named-URL synthesis.
//!
//! A [`Router`] is built exactly once, from a definition callback or from a
//! replayed cache snapshot, and is immutable afterwards. Construction and
//! serving are separate types: [`RouterBuilder`] has no matching API and
//! [`Router`] has no registration API, so a half-built router cannot be
//! asked to route.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::info;

use crate::cache::RouteCache;
use crate::domain::Domain;
use crate::error::Error;
use crate::events::{Flow, Hooks};
use crate::handler::{HandlerRef, Resolver};
use crate::method::Method;
use crate::middleware::Middleware;
use crate::request::{Params, Request};
use crate::response::Response;
use crate::route::{Endpoint, Registration, Route};
use crate::status::Status;

/// Bytes escaped when substituting a parameter into a URL: everything
/// outside the RFC 3986 unreserved set.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// ── Definition phase ──────────────────────────────────────────────────────────

/// Registration surface handed to the definition callback.
///
/// Every call records one `(domain, method, path, handler)` tuple, in order,
/// and returns `&mut Route` for fluent refinement. The empty domain string
/// means "any host".
pub struct Routes {
    entries: Vec<Registration>,
}

impl Routes {
    /// Registers a route. `path` uses `{name}` placeholders for parameters.
    pub fn add(
        &mut self,
        domain: &str,
        method: Method,
        path: &str,
        handler: HandlerRef,
    ) -> &mut Route {
        self.push(domain, method, path, handler, false)
    }

    /// Registers the fallback handler for `domain` (empty string = default
    /// host), invoked when nothing in that domain's tree matches. Fallbacks
    /// bypass method and parameter negotiation.
    pub fn fallback(&mut self, domain: &str, handler: HandlerRef) -> &mut Route {
        self.push(domain, Method::Get, "", handler, true)
    }

    fn push(
        &mut self,
        domain: &str,
        method: Method,
        path: &str,
        handler: HandlerRef,
        fallback: bool,
    ) -> &mut Route {
        let index = self.entries.len();
        self.entries.push(Registration {
            domain: domain.to_owned(),
            method,
            path: path.to_owned(),
            fallback,
            route: Route::new(handler),
        });
        &mut self.entries[index].route
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Configures and builds a [`Router`].
pub struct RouterBuilder {
    resolver: Option<Arc<dyn Resolver>>,
    hooks: Option<Arc<dyn Hooks>>,
    global: Vec<Arc<dyn Middleware>>,
    cache: Option<RouteCache>,
}

impl RouterBuilder {
    /// Sets the resolver used to construct named handlers and middleware at
    /// build time. Required if any registration uses [`HandlerRef::named`]
    /// or route middleware.
    pub fn resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Installs the match hooks.
    pub fn hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Appends one global middleware. Global middleware wraps every route,
    /// outside the route's own middleware, in the order added.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.global.push(Arc::new(middleware));
        self
    }

    /// Enables the route cache. `sources` is the explicit list of
    /// route-defining files whose content fingerprints gate the snapshot's
    /// validity — edit any of them and the next build falls back to the
    /// definition callback.
    pub fn cache(mut self, file: impl Into<PathBuf>, sources: Vec<PathBuf>) -> Self {
        self.cache = Some(RouteCache::new(file.into(), sources));
        self
    }

    /// Builds the router: replays a valid cache snapshot, or runs `define`
    /// and (if caching is enabled) writes a fresh snapshot.
    ///
    /// All registration problems — duplicate routes, invalid patterns,
    /// unresolvable handlers — surface here and abort startup.
    pub fn load(self, define: impl FnOnce(&mut Routes)) -> Result<Router, Error> {
        let cached = self.cache.as_ref().and_then(RouteCache::load);

        let registrations = match cached {
            Some(registrations) => {
                info!(routes = registrations.len(), "route table replayed from cache");
                registrations
            }
            None => {
                let mut routes = Routes { entries: Vec::new() };
                define(&mut routes);
                if let Some(cache) = &self.cache {
                    cache.store(&routes.entries);
                }
                info!(routes = routes.entries.len(), "route table built from definitions");
                routes.entries
            }
        };

        Router::build(registrations, self.resolver, self.hooks, self.global)
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Metadata kept for a named route: the secondary index behind
/// [`Router::url`] and [`Router::named`].
pub struct NamedRoute {
    domain: String,
    method: Method,
    path: String,
    route: Arc<Route>,
}

impl NamedRoute {
    pub fn domain(&self) -> &str { &self.domain }
    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn route(&self) -> &Route { &self.route }
}

/// The built routing table. Read-only; safe to share across concurrent
/// requests behind an `Arc`.
pub struct Router {
    domain: Domain,
    named: HashMap<String, NamedRoute>,
    annotated: Vec<(String, Method, Arc<Route>)>,
    hooks: Option<Arc<dyn Hooks>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder {
            resolver: None,
            hooks: None,
            global: Vec::new(),
            cache: None,
        }
    }

    fn build(
        registrations: Vec<Registration>,
        resolver: Option<Arc<dyn Resolver>>,
        hooks: Option<Arc<dyn Hooks>>,
        global: Vec<Arc<dyn Middleware>>,
    ) -> Result<Self, Error> {
        let mut domain = Domain::default();
        let mut named = HashMap::new();
        let mut annotated = Vec::new();

        for registration in registrations {
            let Registration { domain: host, method, path, fallback, route } = registration;
            let route = Arc::new(route);

            let handler = match &route.handler {
                HandlerRef::Inline(handler) => Arc::clone(handler),
                HandlerRef::Named(name) => resolver
                    .as_deref()
                    .ok_or_else(|| Error::NoResolver(name.clone()))?
                    .handler(name)?,
            };

            let mut chain = global.clone();
            for name in &route.middleware {
                let middleware = resolver
                    .as_deref()
                    .ok_or_else(|| Error::NoResolver(name.clone()))?
                    .middleware(name)?;
                chain.push(middleware);
            }

            let endpoint = Arc::new(Endpoint::new(Arc::clone(&route), handler, &chain));

            if fallback {
                domain.set_fallback(&host, endpoint);
            } else {
                domain.insert(&host, method, &path, &route.patterns, endpoint)?;
                if route.api.as_ref().is_some_and(has_content) {
                    annotated.push((path.clone(), method, Arc::clone(&route)));
                }
            }

            // Last registration wins on a name collision.
            if let Some(name) = &route.name {
                named.insert(
                    name.clone(),
                    NamedRoute { domain: host, method, path, route: Arc::clone(&route) },
                );
            }
        }

        Ok(Self { domain, named, annotated, hooks })
    }

    /// Routes one request to a response.
    ///
    /// Never fails: unroutable requests degrade to 403 (stopped by the
    /// pre-match hook), 404, or 405 with an `Allow` header.
    pub async fn handle(&self, mut req: Request) -> Response {
        if let Some(hooks) = &self.hooks {
            if hooks.before_match(&mut req) == Flow::Stop {
                return Response::empty(Status::Forbidden);
            }
        }

        let matched = self.domain.find(req.host(), req.method(), req.path());

        if let Some((endpoint, params)) = &matched {
            req.set_params(params.clone());
            if let Some(name) = &endpoint.route.name {
                req.set_route_name(name.clone());
            }
        }

        if let Some(hooks) = &self.hooks {
            match &matched {
                Some((endpoint, params)) => hooks.after_match(&req, Some(&endpoint.route), params),
                None => hooks.after_match(&req, None, &Params::new()),
            }
        }

        if req.method() == Method::Options {
            let allowed = self.domain.allowed(req.host(), req.path());
            return if allowed.is_empty() {
                Response::empty(Status::NotFound)
            } else {
                Response::empty(Status::NoContent).with_header("allow", &join(&allowed))
            };
        }

        match matched {
            Some((endpoint, _)) => {
                let head = req.method() == Method::Head;
                let res = endpoint.pipeline.call(req).await;
                if head { res.without_body() } else { res }
            }
            None => {
                let allowed = self.domain.allowed(req.host(), req.path());
                if allowed.is_empty() {
                    Response::empty(Status::NotFound)
                } else {
                    Response::empty(Status::MethodNotAllowed).with_header("allow", &join(&allowed))
                }
            }
        }
    }

    /// Reconstructs the path of a named route, substituting `{param}`
    /// placeholders with percent-encoded values from `params`.
    ///
    /// Unknown names and missing placeholder values are programmer errors
    /// and fail loudly.
    pub fn url(&self, name: &str, params: &Params) -> Result<String, Error> {
        let named = self
            .named
            .get(name)
            .ok_or_else(|| Error::UnknownRoute(name.to_owned()))?;

        let template = named.path.as_str();
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let Some(len) = rest[open..].find('}') else {
                // Unclosed brace: emit the remainder verbatim.
                rest = &rest[open..];
                break;
            };
            let param = &rest[open + 1..open + len];
            let value = params.get(param).ok_or_else(|| Error::MissingParam {
                name: name.to_owned(),
                param: param.to_owned(),
            })?;
            out.push_str(&utf8_percent_encode(value, SEGMENT).to_string());
            rest = &rest[open + len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Looks up the metadata recorded for a named route.
    pub fn named(&self, name: &str) -> Option<&NamedRoute> {
        self.named.get(name)
    }

    /// Emits an OpenAPI document: every route carrying a non-empty api
    /// fragment, grouped by literal path template and lower-cased method.
    pub fn openapi(&self) -> serde_json::Value {
        let mut paths = serde_json::Map::new();
        for (path, method, route) in &self.annotated {
            let fragment = route.api.clone().unwrap_or(serde_json::Value::Null);
            let entry = paths
                .entry(path.clone())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if let Some(operations) = entry.as_object_mut() {
                operations.insert(method.as_str().to_ascii_lowercase(), fragment);
            }
        }

        serde_json::json!({
            "openapi": "3.0.3",
            "info": {
                "title": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "paths": paths,
        })
    }
}

fn join(methods: &BTreeSet<Method>) -> String {
    methods
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Null and `{}` fragments count as "no documentation".
fn has_content(fragment: &serde_json::Value) -> bool {
    match fragment {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> HandlerRef {
        HandlerRef::inline(|_req: Request| async { Response::text("ok") })
    }

    fn router(define: impl FnOnce(&mut Routes)) -> Router {
        Router::builder().load(define).unwrap()
    }

    #[test]
    fn url_round_trip() {
        let router = router(|r| {
            r.add("", Method::Get, "/users/{id}", handler()).name("user.show");
        });

        let params = Params::from([("id".to_owned(), "42".to_owned())]);
        assert_eq!(router.url("user.show", &params).unwrap(), "/users/42");
    }

    #[test]
    fn url_percent_encodes_values() {
        let router = router(|r| {
            r.add("", Method::Get, "/tags/{tag}", handler()).name("tag");
        });

        let params = Params::from([("tag".to_owned(), "a/b c".to_owned())]);
        assert_eq!(router.url("tag", &params).unwrap(), "/tags/a%2Fb%20c");
    }

    #[test]
    fn url_fails_loudly() {
        let router = router(|r| {
            r.add("", Method::Get, "/users/{id}", handler()).name("user.show");
        });

        assert!(matches!(
            router.url("user.show", &Params::new()),
            Err(Error::MissingParam { .. })
        ));
        assert!(matches!(
            router.url("nope", &Params::new()),
            Err(Error::UnknownRoute(_))
        ));
    }

    #[test]
    fn last_name_registration_wins() {
        let router = router(|r| {
            r.add("", Method::Get, "/old", handler()).name("thing");
            r.add("", Method::Get, "/new", handler()).name("thing");
        });

        assert_eq!(router.named("thing").unwrap().path(), "/new");
    }

    #[test]
    fn named_handler_without_resolver_fails_the_build() {
        let err = Router::builder().load(|r| {
            r.add("", Method::Get, "/x", HandlerRef::named("missing"));
        });
        assert!(matches!(err, Err(Error::NoResolver(_))));
    }

    #[test]
    fn duplicate_route_fails_the_build() {
        let err = Router::builder().load(|r| {
            r.add("", Method::Get, "/x", handler());
            r.add("", Method::Get, "/x", handler());
        });
        assert!(matches!(err, Err(Error::DuplicateRoute { .. })));
    }

    #[test]
    fn openapi_groups_by_path_and_method() {
        let router = router(|r| {
            r.add("", Method::Get, "/users/{id}", handler())
                .api(serde_json::json!({"summary": "Fetch a user"}));
            r.add("", Method::Delete, "/users/{id}", handler())
                .api(serde_json::json!({"summary": "Delete a user"}));
            // Undocumented and empty-fragment routes stay out of the document.
            r.add("", Method::Post, "/users", handler());
            r.add("", Method::Get, "/health", handler()).api(serde_json::json!({}));
        });

        let doc = router.openapi();
        assert_eq!(doc["openapi"], "3.0.3");
        assert_eq!(doc["paths"]["/users/{id}"]["get"]["summary"], "Fetch a user");
        assert_eq!(doc["paths"]["/users/{id}"]["delete"]["summary"], "Delete a user");
        assert!(doc["paths"].get("/users").is_none());
        assert!(doc["paths"].get("/health").is_none());
    }

    #[tokio::test]
    async fn head_strips_the_matched_get_response_body() {
        let router = router(|r| {
            r.add(
                "",
                Method::Get,
                "/items",
                HandlerRef::inline(|_req: Request| async {
                    Response::json(br#"[1,2,3]"#.to_vec()).with_header("etag", "\"v1\"")
                }),
            );
        });

        let res = router.handle(Request::new(Method::Head, "", "/items")).await;
        assert_eq!(res.status_code(), 200);
        assert!(res.body().is_empty());
        assert_eq!(res.header("etag"), Some("\"v1\""));
        assert_eq!(res.header("content-type"), None);
    }
}
