//! Unified error type.
//!
//! Every variant here is a build-time or programmer error: it aborts startup
//! (or the `url()` call that triggered it) rather than degrading. Runtime
//! routing failures are never `Error`s — they are expressed as HTTP
//! [`Response`](crate::Response) values (403, 404, 405) by the router itself.

use crate::method::Method;

/// The error type returned by trellis's fallible operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two routes registered for the same method and path.
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: Method, path: String },

    /// A per-parameter regex override failed to compile.
    #[error("invalid pattern `{pattern}` for parameter `{{{param}}}`: {source}")]
    InvalidPattern {
        param: String,
        pattern: String,
        source: regex::Error,
    },

    /// A named handler could not be resolved through the configured
    /// [`Resolver`](crate::Resolver).
    #[error("cannot resolve handler `{0}`")]
    UnknownHandler(String),

    /// A route middleware name could not be resolved.
    #[error("cannot resolve middleware `{0}`")]
    UnknownMiddleware(String),

    /// A named handler or route middleware was registered but no resolver
    /// was configured on the builder.
    #[error("route references `{0}` but no resolver is configured")]
    NoResolver(String),

    /// `url()` was called with a route name that was never registered.
    #[error("unknown route name `{0}`")]
    UnknownRoute(String),

    /// `url()` was called without a value for a placeholder in the template.
    #[error("missing value for parameter `{{{param}}}` in route `{name}`")]
    MissingParam { name: String, param: String },
}
