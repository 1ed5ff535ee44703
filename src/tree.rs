//! The per-domain routing tree.
//!
//! One [`Node`] per path level. Literal segments hash directly to a child;
//! parametrized segments (`{name}`) are tried in registration order against
//! compiled patterns. Matching is a depth-first search that backtracks over
//! variable children only — at most one static child can equal a literal
//! segment, so a failed static descent falls through to the variable
//! children and nothing else.
//!
//! The tree is built once at startup and never mutated afterwards; matching
//! is a pure traversal over shared immutable structure.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::Error;
use crate::method::Method;
use crate::request::Params;
use crate::route::Endpoint;

/// Pattern used for `{param}` segments without an override: anything up to
/// the next slash.
const DEFAULT_PATTERN: &str = "[^/]+";

/// A parametrized child: one compiled single-segment pattern plus the
/// subtree reached after consuming that segment.
///
/// Siblings are keyed by `(pattern, param name)` — two routes using the same
/// pattern *and* the same name at the same position share one subtree;
/// anything else creates a sibling tried in registration order.
pub(crate) struct VariableSegment {
    pattern: String,
    param: String,
    regex: Regex,
    node: Node,
}

/// One level of a routing tree.
#[derive(Default)]
pub(crate) struct Node {
    static_children: HashMap<String, Node>,
    variable_children: Vec<VariableSegment>,
    routes: HashMap<Method, Arc<Endpoint>>,
}

impl Node {
    /// Registers `endpoint` for `method` at the path spelled by `segments`.
    ///
    /// `path` is the original template, used only for error messages.
    /// Registering a second route for the same `(method, path)` is a fatal
    /// build error.
    pub(crate) fn insert(
        &mut self,
        method: Method,
        segments: &[&str],
        patterns: &HashMap<String, String>,
        endpoint: Arc<Endpoint>,
        path: &str,
    ) -> Result<(), Error> {
        let Some((segment, rest)) = segments.split_first() else {
            if self.routes.contains_key(&method) {
                return Err(Error::DuplicateRoute { method, path: path.to_owned() });
            }
            self.routes.insert(method, endpoint);
            return Ok(());
        };

        if let Some(param) = parameter_name(segment) {
            let pattern = patterns.get(param).map_or(DEFAULT_PATTERN, String::as_str);
            let child = self.variable_child(param, pattern)?;
            child.insert(method, rest, patterns, endpoint, path)
        } else {
            self.static_children
                .entry((*segment).to_owned())
                .or_default()
                .insert(method, rest, patterns, endpoint, path)
        }
    }

    /// Finds or creates the variable child for `(pattern, param)`.
    fn variable_child(&mut self, param: &str, pattern: &str) -> Result<&mut Node, Error> {
        let pos = self
            .variable_children
            .iter()
            .position(|v| v.pattern == pattern && v.param == param);

        let pos = match pos {
            Some(pos) => pos,
            None => {
                let regex = compile(pattern).map_err(|source| Error::InvalidPattern {
                    param: param.to_owned(),
                    pattern: pattern.to_owned(),
                    source,
                })?;
                self.variable_children.push(VariableSegment {
                    pattern: pattern.to_owned(),
                    param: param.to_owned(),
                    regex,
                    node: Node::default(),
                });
                self.variable_children.len() - 1
            }
        };

        Ok(&mut self.variable_children[pos].node)
    }

    /// Resolves `method` + the remaining `segments` to an endpoint and the
    /// captured parameters, or `None`.
    ///
    /// The params map travels by value: each variable attempt recurses with
    /// an extended copy and the original stays untouched, so a failed deep
    /// branch leaves no stale binding to undo.
    pub(crate) fn find(
        &self,
        method: Method,
        segments: &[&str],
        params: Params,
        index: usize,
    ) -> Option<(Arc<Endpoint>, Params)> {
        if index == segments.len() {
            let endpoint = self.routes.get(&method).or_else(|| {
                // HEAD is implicitly satisfied by a GET registration.
                (method == Method::Head)
                    .then(|| self.routes.get(&Method::Get))
                    .flatten()
            })?;
            return Some((Arc::clone(endpoint), params));
        }

        let segment = segments[index];

        // Static child first: literal segments outrank patterns at the same
        // level. A deep failure under it still falls through to the
        // variable children below.
        if let Some(child) = self.static_children.get(segment) {
            if let Some(hit) = child.find(method, segments, params.clone(), index + 1) {
                return Some(hit);
            }
        }

        for var in &self.variable_children {
            if !var.regex.is_match(segment) {
                continue;
            }
            let mut bound = params.clone();
            bound.insert(var.param.clone(), segment.to_owned());
            if let Some(hit) = var.node.find(method, segments, bound, index + 1) {
                return Some(hit);
            }
        }

        None
    }

    /// Accumulates every method registered at the end of `segments`, across
    /// all structurally matching branches. Drives the `Allow` header and the
    /// 404-vs-405 decision.
    pub(crate) fn collect_methods(
        &self,
        segments: &[&str],
        index: usize,
        out: &mut BTreeSet<Method>,
    ) {
        if index == segments.len() {
            out.extend(self.routes.keys().copied());
            return;
        }

        let segment = segments[index];

        if let Some(child) = self.static_children.get(segment) {
            child.collect_methods(segments, index + 1, out);
        }
        for var in &self.variable_children {
            if var.regex.is_match(segment) {
                var.node.collect_methods(segments, index + 1, out);
            }
        }
    }
}

/// Returns the parameter name if `segment` uses the `{name}` syntax.
fn parameter_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Compiles a single-segment pattern: anchored to the whole segment,
/// case-insensitive, Unicode-aware.
fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"\A(?:{pattern})\z"))
        .case_insensitive(true)
        .build()
}
