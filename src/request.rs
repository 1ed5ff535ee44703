//! Incoming HTTP request type.

use std::collections::HashMap;

use crate::method::Method;

/// Parameter values captured from a matched path, keyed by parameter name.
pub type Params = HashMap<String, String>;

/// An incoming HTTP request.
///
/// The router reads `method`, `host`, and `path`, and — after a successful
/// match — attaches the captured path parameters and the matched route's
/// name, readable via [`param`](Request::param) and
/// [`route_name`](Request::route_name).
pub struct Request {
    method: Method,
    host: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    params: Params,
    route_name: Option<String>,
}

impl Request {
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            host: host.into(),
            path: path.into(),
            headers: Vec::new(),
            body: Vec::new(),
            params: Params::new(),
            route_name: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn host(&self) -> &str { &self.host }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Replaces the request path. Intended for pre-match hooks that rewrite
    /// the request before routing.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// All captured path parameters.
    pub fn params(&self) -> &Params { &self.params }

    /// The name of the matched route, if the route was given one.
    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub(crate) fn set_route_name(&mut self, name: String) {
        self.route_name = Some(name);
    }
}
