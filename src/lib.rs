//! # trellis
//!
//! The routing core of a multi-tenant web service: per-domain route trees,
//! path parameters, per-route middleware, method negotiation, named-route
//! URL synthesis, and a fingerprint-validated route cache.
//!
//! ## The contract
//!
//! The table is built exactly once, before the first request, and is
//! immutable afterwards. Matching is a pure traversal over shared structure:
//! no locks, no IO, no allocation beyond the captured parameters. Everything
//! that can go wrong at request time has an HTTP answer (403, 404, 405);
//! everything that can go wrong at build time aborts startup.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::{HandlerRef, Method, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = Router::builder()
//!         .load(|r| {
//!             r.add("", Method::Get, "/users/{id}", HandlerRef::inline(get_user))
//!                 .name("user.show")
//!                 .pattern("id", "[0-9]+");
//!         })
//!         .unwrap();
//!
//!     Server::bind("0.0.0.0:3000").serve(router).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//! ```
//!
//! ## Matching rules
//!
//! - One tree per registered hostname, plus a default tree for everything
//!   else; a per-domain fallback route catches what the tree does not.
//! - `{name}` segments match `[^/]+` unless the route overrides the pattern;
//!   literal segments always outrank patterns at the same level, and the
//!   matcher backtracks across sibling patterns on a deeper failure.
//! - `HEAD` is satisfied by a `GET` registration; `OPTIONS` and unmatched
//!   methods are answered from the aggregated method set for the path.

mod cache;
mod domain;
mod error;
mod events;
mod method;
mod request;
mod response;
mod route;
mod router;
mod server;
mod status;
mod tree;

pub mod handler;
pub mod middleware;

pub use error::Error;
pub use events::{Flow, Hooks};
pub use handler::{Handler, HandlerRef, Resolver};
pub use method::Method;
pub use middleware::{Middleware, Next};
pub use request::{Params, Request};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use route::Route;
pub use router::{NamedRoute, Router, RouterBuilder, Routes};
pub use server::Server;
pub use status::Status;
