//! Persisted route-table snapshots with content-fingerprint invalidation.
//!
//! The snapshot stores the flat registration list exactly as the definition
//! callback produced it, plus a SHA-256 fingerprint for every route-defining
//! source file the caller declared. A snapshot is replayed only while every
//! recorded file still exists with an identical fingerprint; any change,
//! parse failure, or IO error is a cache miss and the table is rebuilt from
//! the callback.
//!
//! The cache is an optimization, never a requirement: `store` degrades to a
//! warning on any failure (inline handlers that cannot be serialized across
//! processes, unreadable source files, a write error) and the router starts
//! from the freshly built table either way.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::handler::HandlerRef;
use crate::method::Method;
use crate::route::{Registration, Route};

const SNAPSHOT_VERSION: u32 = 1;

/// Location of the snapshot file plus the source files whose fingerprints
/// gate its validity.
pub(crate) struct RouteCache {
    file: PathBuf,
    sources: Vec<PathBuf>,
}

#[derive(Deserialize, Serialize)]
struct Snapshot {
    version: u32,
    fingerprints: BTreeMap<String, String>,
    routes: Vec<Record>,
}

/// One registration tuple in its persisted form.
#[derive(Deserialize, Serialize)]
struct Record {
    domain: String,
    method: String,
    path: String,
    #[serde(default)]
    fallback: bool,
    handler: String,
    #[serde(default)]
    middleware: Vec<String>,
    #[serde(default)]
    patterns: BTreeMap<String, String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    api: Option<serde_json::Value>,
}

impl RouteCache {
    pub(crate) fn new(file: PathBuf, sources: Vec<PathBuf>) -> Self {
        Self { file, sources }
    }

    /// Replays the snapshot, or returns `None` on any kind of miss.
    pub(crate) fn load(&self) -> Option<Vec<Registration>> {
        let bytes = fs::read(&self.file).ok()?;
        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(file = %self.file.display(), "unreadable route cache: {e}");
                return None;
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            debug!(version = snapshot.version, "route cache version mismatch");
            return None;
        }

        for (source, recorded) in &snapshot.fingerprints {
            match fs::read(source).ok().map(|bytes| fingerprint(&bytes)) {
                Some(current) if current == *recorded => {}
                _ => {
                    debug!(source, "route cache stale");
                    return None;
                }
            }
        }

        let mut registrations = Vec::with_capacity(snapshot.routes.len());
        for record in snapshot.routes {
            registrations.push(record.into_registration()?);
        }
        debug!(routes = registrations.len(), "route cache hit");
        Some(registrations)
    }

    /// Writes a fresh snapshot for `registrations`. Best effort: a table
    /// that cannot be snapshotted is logged and skipped, never fatal.
    pub(crate) fn store(&self, registrations: &[Registration]) {
        let cacheable = registrations
            .iter()
            .all(|r| matches!(r.route.handler, HandlerRef::Named(_)));
        if !cacheable {
            warn!("route table contains inline handlers; cache not written");
            return;
        }

        let mut fingerprints = BTreeMap::new();
        for source in &self.sources {
            let bytes = match fs::read(source) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(source = %source.display(), "cannot fingerprint route source: {e}; cache not written");
                    return;
                }
            };
            fingerprints.insert(source.display().to_string(), fingerprint(&bytes));
        }

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            fingerprints,
            routes: registrations.iter().map(Record::from_registration).collect(),
        };
        let bytes = match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("cannot serialize route cache: {e}");
                return;
            }
        };
        if let Err(e) = fs::write(&self.file, bytes) {
            warn!(file = %self.file.display(), "cannot write route cache: {e}");
            return;
        }
        debug!(file = %self.file.display(), routes = registrations.len(), "route cache written");
    }
}

impl Record {
    fn from_registration(reg: &Registration) -> Self {
        let handler = match &reg.route.handler {
            HandlerRef::Named(name) => name.clone(),
            // Unreachable: `store` rejects inline tables before building records.
            HandlerRef::Inline(_) => String::new(),
        };
        Self {
            domain: reg.domain.clone(),
            method: reg.method.as_str().to_owned(),
            path: reg.path.clone(),
            fallback: reg.fallback,
            handler,
            middleware: reg.route.middleware.clone(),
            patterns: reg.route.patterns.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            name: reg.route.name.clone(),
            api: reg.route.api.clone(),
        }
    }

    fn into_registration(self) -> Option<Registration> {
        let method = Method::from_str(&self.method).ok()?;
        let mut route = Route::new(HandlerRef::Named(self.handler));
        route.middleware = self.middleware;
        route.patterns = self.patterns.into_iter().collect();
        route.name = self.name;
        route.api = self.api;
        Some(Registration {
            domain: self.domain,
            method,
            path: self.path,
            fallback: self.fallback,
            route,
        })
    }
}

/// SHA-256 of the file bytes, lowercase hex.
fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, path: &str) -> Registration {
        let mut route = Route::new(HandlerRef::named(name));
        route.name(format!("{name}.route"));
        Registration {
            domain: String::new(),
            method: Method::Get,
            path: path.to_owned(),
            fallback: false,
            route,
        }
    }

    #[test]
    fn round_trips_when_sources_are_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routes.rs");
        fs::write(&source, b"fn routes() {}").unwrap();

        let cache = RouteCache::new(dir.path().join("routes.json"), vec![source]);
        cache.store(&[registration("users.show", "/users/{id}")]);

        let replayed = cache.load().expect("expected cache hit");
        assert_eq!(replayed.len(), 1);
        assert_eq!(replayed[0].path, "/users/{id}");
        assert_eq!(replayed[0].route.route_name(), Some("users.show.route"));
    }

    #[test]
    fn changed_source_invalidates_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routes.rs");
        fs::write(&source, b"v1").unwrap();

        let cache = RouteCache::new(dir.path().join("routes.json"), vec![source.clone()]);
        cache.store(&[registration("a", "/a")]);

        fs::write(&source, b"v2").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn missing_source_invalidates_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("routes.rs");
        fs::write(&source, b"v1").unwrap();

        let cache = RouteCache::new(dir.path().join("routes.json"), vec![source.clone()]);
        cache.store(&[registration("a", "/a")]);

        fs::remove_file(&source).unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn unreadable_source_skips_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routes.json");
        let source = dir.path().join("never-created.rs");

        let cache = RouteCache::new(file.clone(), vec![source]);
        cache.store(&[registration("a", "/a")]);
        assert!(!file.exists());
    }

    #[test]
    fn inline_handlers_are_not_persisted() {
        use crate::request::Request;
        use crate::response::Response;

        let dir = tempfile::tempdir().unwrap();
        let cache = RouteCache::new(dir.path().join("routes.json"), Vec::new());

        let reg = Registration {
            domain: String::new(),
            method: Method::Get,
            path: "/".to_owned(),
            fallback: false,
            route: Route::new(HandlerRef::inline(|_req: Request| async {
                Response::text("hi")
            })),
        };
        cache.store(&[reg]);
        assert!(!dir.path().join("routes.json").exists());
    }

    #[test]
    fn garbage_snapshot_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routes.json");
        fs::write(&file, b"not json").unwrap();

        let cache = RouteCache::new(file, Vec::new());
        assert!(cache.load().is_none());
    }
}
