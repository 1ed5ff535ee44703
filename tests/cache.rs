//! Cache replay and fingerprint invalidation through the public API.

use std::fs;
use std::path::PathBuf;

use trellis::handler::BoxedHandler;
use trellis::{Error, Handler, HandlerRef, Method, Request, Resolver, Response, Router, Routes};

struct Registry;

impl Resolver for Registry {
    fn handler(&self, name: &str) -> Result<BoxedHandler, Error> {
        let tag = name.to_owned();
        Ok((move |_req: Request| {
            let tag = tag.clone();
            async move { Response::text(tag) }
        })
        .into_boxed_handler())
    }
}

fn build(
    cache_file: &PathBuf,
    source: &PathBuf,
    define: impl FnOnce(&mut Routes),
) -> Router {
    Router::builder()
        .resolver(Registry)
        .cache(cache_file, vec![source.clone()])
        .load(define)
        .unwrap()
}

async fn status(router: &Router, path: &str) -> u16 {
    router
        .handle(Request::new(Method::Get, "", path))
        .await
        .status_code()
}

#[tokio::test]
async fn unchanged_sources_replay_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("routes.json");
    let source = dir.path().join("routes.def");
    fs::write(&source, "v1").unwrap();

    let router = build(&cache_file, &source, |r| {
        r.add("", Method::Get, "/a", HandlerRef::named("a"));
    });
    assert_eq!(status(&router, "/a").await, 200);
    assert!(cache_file.exists());

    // Second build adds /b to the callback, but the source fingerprint is
    // unchanged, so the stale-by-intent snapshot wins and /b stays unknown.
    let router = build(&cache_file, &source, |r| {
        r.add("", Method::Get, "/a", HandlerRef::named("a"));
        r.add("", Method::Get, "/b", HandlerRef::named("b"));
    });
    assert_eq!(status(&router, "/a").await, 200);
    assert_eq!(status(&router, "/b").await, 404);
}

#[tokio::test]
async fn changed_source_rebuilds_and_rewrites_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("routes.json");
    let source = dir.path().join("routes.def");
    fs::write(&source, "v1").unwrap();

    let router = build(&cache_file, &source, |r| {
        r.add("", Method::Get, "/a", HandlerRef::named("a"));
    });
    assert_eq!(status(&router, "/b").await, 404);

    // Editing the source invalidates the snapshot; the callback runs again.
    fs::write(&source, "v2").unwrap();
    let router = build(&cache_file, &source, |r| {
        r.add("", Method::Get, "/a", HandlerRef::named("a"));
        r.add("", Method::Get, "/b", HandlerRef::named("b"));
    });
    assert_eq!(status(&router, "/b").await, 200);

    // The rewrite captured the new fingerprint: the next build replays.
    let router = build(&cache_file, &source, |r| {
        r.add("", Method::Get, "/c", HandlerRef::named("c"));
    });
    assert_eq!(status(&router, "/b").await, 200);
    assert_eq!(status(&router, "/c").await, 404);
}

#[tokio::test]
async fn snapshot_preserves_names_patterns_and_route_middleware() {
    use std::sync::Arc;
    use trellis::handler::BoxFuture;
    use trellis::{Middleware, Next, Params};

    struct Full;

    impl Resolver for Full {
        fn handler(&self, name: &str) -> Result<BoxedHandler, Error> {
            Registry.handler(name)
        }

        fn middleware(&self, name: &str) -> Result<Arc<dyn Middleware>, Error> {
            struct Bang;
            impl Middleware for Bang {
                fn handle(&self, req: Request, next: Next) -> BoxFuture {
                    Box::pin(async move {
                        let res = next.run(req).await;
                        let body = [res.body(), b"!".as_slice()].concat();
                        res.with_body(body)
                    })
                }
            }
            match name {
                "bang" => Ok(Arc::new(Bang)),
                _ => Err(Error::UnknownMiddleware(name.to_owned())),
            }
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("routes.json");
    let source = dir.path().join("routes.def");
    fs::write(&source, "v1").unwrap();

    let define = |r: &mut Routes| {
        r.add("", Method::Get, "/users/{id}", HandlerRef::named("user"))
            .name("user.show")
            .pattern("id", "[0-9]+")
            .middleware("bang");
    };

    let first = Router::builder()
        .resolver(Full)
        .cache(&cache_file, vec![source.clone()])
        .load(define)
        .unwrap();
    assert_eq!(status(&first, "/users/abc").await, 404);

    // Replayed from the snapshot: same pattern, name, and middleware.
    let replayed = Router::builder()
        .resolver(Full)
        .cache(&cache_file, vec![source.clone()])
        .load(|_| panic!("definition callback must not run on a cache hit"))
        .unwrap();

    assert_eq!(status(&replayed, "/users/abc").await, 404);
    let res = replayed.handle(Request::new(Method::Get, "", "/users/42")).await;
    assert_eq!(res.body(), b"user!");

    let params = Params::from([("id".to_owned(), "7".to_owned())]);
    assert_eq!(replayed.url("user.show", &params).unwrap(), "/users/7");
}

#[tokio::test]
async fn missing_source_still_builds_and_serves() {
    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("routes.json");
    let source = dir.path().join("never-created.def");

    // The declared source does not exist: the build must still succeed and
    // serve from the fresh table; only the snapshot write is skipped.
    let router = build(&cache_file, &source, |r| {
        r.add("", Method::Get, "/a", HandlerRef::named("a"));
    });
    assert_eq!(status(&router, "/a").await, 200);
    assert!(!cache_file.exists());
}

#[tokio::test]
async fn inline_tables_serve_but_never_persist() {
    let dir = tempfile::tempdir().unwrap();
    let cache_file = dir.path().join("routes.json");
    let source = dir.path().join("routes.def");
    fs::write(&source, "v1").unwrap();

    let router = Router::builder()
        .cache(&cache_file, vec![source.clone()])
        .load(|r| {
            r.add(
                "",
                Method::Get,
                "/a",
                HandlerRef::inline(|_req: Request| async { Response::text("a") }),
            );
        })
        .unwrap();

    assert_eq!(status(&router, "/a").await, 200);
    assert!(!cache_file.exists());
}
