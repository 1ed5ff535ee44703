//! Built-in request tracing middleware.

use std::time::Instant;

use tracing::info;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;

/// Logs one structured event per request: method, path, status, latency.
///
/// Install as the first global middleware so it observes the final status
/// and the full chain's latency:
///
/// ```rust,no_run
/// # use trellis::{Router, middleware::Trace};
/// let builder = Router::builder().middleware(Trace);
/// ```
pub struct Trace;

impl Middleware for Trace {
    fn handle(&self, req: Request, next: Next) -> BoxFuture {
        let method = req.method();
        let path = req.path().to_owned();

        Box::pin(async move {
            let start = Instant::now();
            let res = next.run(req).await;
            info!(
                %method,
                path,
                status = res.status_code(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "request",
            );
            res
        })
    }
}
