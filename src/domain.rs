//! Host-scoped dispatch.
//!
//! One routing tree per registered hostname plus one default tree for
//! requests whose host matches nothing. The trees are fully independent —
//! there is no inheritance from the default tree into a host tree.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::Error;
use crate::method::Method;
use crate::request::Params;
use crate::route::Endpoint;
use crate::tree::Node;

/// The top level of the routing table: hostname dispatch over [`Node`] trees
/// plus per-host fallback endpoints.
#[derive(Default)]
pub(crate) struct Domain {
    hosts: HashMap<String, Node>,
    default: Node,
    /// Keyed by lowercased hostname; the empty string is the fallback for
    /// the default (host-less) tree.
    fallbacks: HashMap<String, Arc<Endpoint>>,
}

impl Domain {
    /// Registers a route in the tree for `host` (empty string = default tree).
    pub(crate) fn insert(
        &mut self,
        host: &str,
        method: Method,
        path: &str,
        patterns: &HashMap<String, String>,
        endpoint: Arc<Endpoint>,
    ) -> Result<(), Error> {
        let segments = split_path(path);
        self.tree_mut(host)
            .insert(method, &segments, patterns, endpoint, path)
    }

    /// Registers the fallback endpoint for `host` (empty string = default).
    pub(crate) fn set_fallback(&mut self, host: &str, endpoint: Arc<Endpoint>) {
        self.fallbacks.insert(host.to_ascii_lowercase(), endpoint);
    }

    /// Resolves a request to an endpoint and its captured parameters.
    ///
    /// Order: the exact-host tree, that host's fallback, the default tree,
    /// the default fallback. Fallbacks bypass method and parameter
    /// negotiation and always carry empty params.
    pub(crate) fn find(
        &self,
        host: &str,
        method: Method,
        path: &str,
    ) -> Option<(Arc<Endpoint>, Params)> {
        let host = host.to_ascii_lowercase();
        let segments = split_path(path);

        if let Some(tree) = self.hosts.get(&host) {
            if let Some(hit) = tree.find(method, &segments, Params::new(), 0) {
                return Some(hit);
            }
        }
        if !host.is_empty() {
            if let Some(fallback) = self.fallbacks.get(&host) {
                return Some((Arc::clone(fallback), Params::new()));
            }
        }

        if let Some(hit) = self.default.find(method, &segments, Params::new(), 0) {
            return Some(hit);
        }
        self.fallbacks
            .get("")
            .map(|fallback| (Arc::clone(fallback), Params::new()))
    }

    /// Union of the methods registered for `path` in the exact-host tree and
    /// the default tree — every method a request for this host and path
    /// could be dispatched to.
    pub(crate) fn allowed(&self, host: &str, path: &str) -> BTreeSet<Method> {
        let segments = split_path(path);
        let mut out = BTreeSet::new();
        if let Some(tree) = self.hosts.get(&host.to_ascii_lowercase()) {
            tree.collect_methods(&segments, 0, &mut out);
        }
        self.default.collect_methods(&segments, 0, &mut out);
        out
    }

    fn tree_mut(&mut self, host: &str) -> &mut Node {
        if host.is_empty() {
            &mut self.default
        } else {
            self.hosts.entry(host.to_ascii_lowercase()).or_default()
        }
    }
}

/// Splits a request path into segments. The root path is the empty segment
/// list, not a one-element list holding an empty string.
fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}
