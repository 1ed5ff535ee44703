//! Minimal trellis example — a multi-domain JSON API with middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X OPTIONS -i http://localhost:3000/users/42
//!   curl -X DELETE -i http://localhost:3000/users/42
//!   curl -H 'host: admin.localhost' http://localhost:3000/anything

use trellis::middleware::Trace;
use trellis::{HandlerRef, Method, Params, Request, Response, Router, Server, Status};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let router = Router::builder()
        .middleware(Trace)
        .load(|r| {
            r.add("", Method::Get, "/users/{id}", HandlerRef::inline(get_user))
                .name("user.show")
                .pattern("id", "[0-9]+")
                .api(serde_json::json!({"summary": "Fetch a user"}));
            r.add("", Method::Post, "/users", HandlerRef::inline(create_user));
            r.add("", Method::Delete, "/users/{id}", HandlerRef::inline(delete_user))
                .pattern("id", "[0-9]+");

            // Everything under admin.localhost is its own route table.
            r.fallback("admin.localhost", HandlerRef::inline(admin_placeholder));
        })
        .expect("route table");

    // Named routes reconstruct their own URLs.
    let params = Params::from([("id".to_owned(), "42".to_owned())]);
    println!("user.show → {}", router.url("user.show", &params).expect("url"));

    Server::bind("0.0.0.0:3000")
        .serve(router)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::empty(Status::BadRequest);
    }
    Response::builder()
        .status(Status::Created)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.to_owned().into_bytes())
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> Response {
    Response::empty(Status::NoContent)
}

// Any request to admin.localhost that matches nothing structural.
async fn admin_placeholder(_req: Request) -> Response {
    Response::html("<h1>admin console — coming soon</h1>")
}
