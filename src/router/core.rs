//! Route table core module - hot path for request dispatch.
//!
//! The table is built once from [`RouteData`] and never mutated afterwards, so
//! it can be shared across request-handling threads behind an `Arc`.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use regex::Regex;
use regex_syntax::hir::{Hir, HirKind};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::tree::{SegmentTree, TreeLeaf};
use crate::error::RoutingError;
use crate::generator::{
    DataGenerator, GroupCountBasedGenerator, NamedRoute, RouteData, RouteDescriptor,
    ROUTE_DATA_FORMAT_VERSION,
};
use crate::route::{normalize_path, split_segments, RouteCollection};

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>`: they come from the compiled table and are
/// shared, values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route's compiled descriptor
    pub descriptor: Arc<RouteDescriptor>,
    /// Path parameters extracted from the URL (e.g., `{id}` → `("id", "123")`)
    pub params: ParamVec,
}

impl RouteMatch {
    /// Handler reference of the matched route
    #[inline]
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.descriptor.handler
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics if a name occurs more than once.
    #[inline]
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert params to a HashMap
    /// Note: This allocates - use get_param() in hot paths instead
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct CompiledDynamic {
    descriptor: Arc<RouteDescriptor>,
    parameters: Vec<(Arc<str>, usize)>,
}

#[derive(Debug, Clone)]
struct CompiledChunk {
    regex: Regex,
    routes: HashMap<usize, CompiledDynamic>,
}

/// Immutable dispatch table compiled from [`RouteData`].
#[derive(Debug, Clone)]
pub struct RouteTable {
    data: Arc<RouteData>,
    static_routes: HashMap<Method, HashMap<String, Arc<RouteDescriptor>>>,
    dynamic_routes: HashMap<Method, Vec<CompiledChunk>>,
    constrained_routes: HashMap<Method, SegmentTree>,
}

fn parse_method(method: &str) -> Result<Method, RoutingError> {
    Method::from_bytes(method.as_bytes())
        .map_err(|_| RoutingError::malformed(format!("invalid HTTP method '{method}'")))
}

fn check_descriptor(descriptor: &RouteDescriptor) -> Result<(), RoutingError> {
    if descriptor.name.as_deref() == Some("") {
        return Err(RoutingError::malformed(format!(
            "route '{}' has an empty name",
            descriptor.path
        )));
    }
    Ok(())
}

/// Capture indices of the empty marker groups closing each alternative.
fn marker_groups(hir: &Hir, markers: &mut BTreeSet<usize>) {
    match hir.kind() {
        HirKind::Capture(capture) if matches!(capture.sub.kind(), HirKind::Empty) => {
            markers.insert(capture.index as usize);
        }
        HirKind::Capture(capture) => marker_groups(&capture.sub, markers),
        HirKind::Repetition(repetition) => marker_groups(&repetition.sub, markers),
        HirKind::Concat(children) | HirKind::Alternation(children) => {
            for child in children {
                marker_groups(child, markers);
            }
        }
        HirKind::Empty | HirKind::Literal(_) | HirKind::Class(_) | HirKind::Look(_) => {}
    }
}

/// Percent-decode a captured value; undecodable input is kept as captured.
fn decode_param(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(Cow::Borrowed(value)) => value.to_string(),
        Ok(Cow::Owned(value)) => value,
        Err(_) => raw.to_string(),
    }
}

impl RouteTable {
    /// Compile a route collection with the default generator.
    pub fn compile(routes: &RouteCollection) -> Result<Self, RoutingError> {
        Self::from_generator(&GroupCountBasedGenerator::new(routes.clone()))
    }

    /// Build the table from any data generator (for example a cached one).
    pub fn from_generator(generator: &impl DataGenerator) -> Result<Self, RoutingError> {
        Self::from_data(generator.data()?)
    }

    /// Compile regexes and segment trees from `data`, rejecting data whose
    /// route maps or names are inconsistent.
    pub fn from_data(data: RouteData) -> Result<Self, RoutingError> {
        if data.format_version != ROUTE_DATA_FORMAT_VERSION {
            return Err(RoutingError::malformed(format!(
                "format version {} is not supported (expected {ROUTE_DATA_FORMAT_VERSION})",
                data.format_version
            )));
        }

        let mut static_routes = HashMap::new();
        for (method, paths) in &data.static_routes {
            let table: &mut HashMap<String, Arc<RouteDescriptor>> =
                static_routes.entry(parse_method(method)?).or_default();
            for (path, descriptor) in paths {
                check_descriptor(descriptor)?;
                table.insert(path.clone(), Arc::new(descriptor.clone()));
            }
        }

        let mut dynamic_routes = HashMap::new();
        for (method, chunks) in &data.dynamic_routes {
            let compiled = chunks
                .iter()
                .map(|chunk| {
                    let regex = Regex::new(&chunk.regex).map_err(|e| {
                        RoutingError::malformed(format!("chunk regex does not compile: {e}"))
                    })?;
                    let hir = regex_syntax::parse(&chunk.regex).map_err(|e| {
                        RoutingError::malformed(format!("chunk regex does not parse: {e}"))
                    })?;
                    let mut markers = BTreeSet::new();
                    marker_groups(&hir, &mut markers);
                    // every alternative needs exactly one entry, keyed by marker + 1
                    if let Some(group_count) = chunk
                        .route_map
                        .keys()
                        .find(|k| **k == 0 || !markers.contains(&(**k - 1)))
                    {
                        return Err(RoutingError::malformed(format!(
                            "route map entry {group_count} does not correspond to an alternative of '{}'",
                            chunk.regex
                        )));
                    }
                    if let Some(marker) = markers.iter().find(|m| !chunk.route_map.contains_key(&(**m + 1))) {
                        return Err(RoutingError::malformed(format!(
                            "alternative closed by group {marker} of '{}' has no route map entry",
                            chunk.regex
                        )));
                    }
                    let mut routes = HashMap::with_capacity(chunk.route_map.len());
                    let mut previous_marker = 0;
                    for (group_count, route) in &chunk.route_map {
                        check_descriptor(&route.descriptor)?;
                        let marker = group_count - 1;
                        if route
                            .parameters
                            .iter()
                            .any(|(_, group)| *group <= previous_marker || *group >= marker)
                        {
                            return Err(RoutingError::malformed(format!(
                                "parameters of route '{}' point outside its alternative",
                                route.descriptor.path
                            )));
                        }
                        previous_marker = marker;
                        routes.insert(
                            *group_count,
                            CompiledDynamic {
                                descriptor: Arc::new(route.descriptor.clone()),
                                parameters: route
                                    .parameters
                                    .iter()
                                    .map(|(name, group)| (Arc::from(name.as_str()), *group))
                                    .collect(),
                            },
                        );
                    }
                    Ok(CompiledChunk { regex, routes })
                })
                .collect::<Result<Vec<_>, RoutingError>>()?;
            dynamic_routes.insert(parse_method(method)?, compiled);
        }

        let mut constrained_routes = HashMap::new();
        for (method, routes) in &data.constrained_routes {
            let tree: &mut SegmentTree = constrained_routes.entry(parse_method(method)?).or_default();
            for route in routes {
                check_descriptor(&route.descriptor)?;
                tree.insert(
                    &route.matchers,
                    TreeLeaf {
                        descriptor: Arc::new(route.descriptor.clone()),
                        parameter_names: route
                            .parameter_names
                            .iter()
                            .map(|n| Arc::from(n.as_str()))
                            .collect(),
                    },
                )?;
            }
        }

        for (name, named) in &data.named_routes {
            if name.is_empty() {
                return Err(RoutingError::malformed("named route with an empty name"));
            }
            if let NamedRoute::Template { path, params } = named {
                if let Some(missing) = params.iter().find(|p| !path.contains(&format!("{{{p}"))) {
                    return Err(RoutingError::malformed(format!(
                        "route '{name}' lists parameter '{missing}' absent from '{path}'"
                    )));
                }
            }
        }

        info!(
            compiled_entries = data.route_count(),
            static_methods = static_routes.len(),
            dynamic_methods = dynamic_routes.len(),
            constrained_methods = constrained_routes.len(),
            routing_algorithm = "group_count",
            "Routing table loaded"
        );

        Ok(Self {
            data: Arc::new(data),
            static_routes,
            dynamic_routes,
            constrained_routes,
        })
    }

    /// The route data this table was built from.
    #[must_use]
    pub fn data(&self) -> &Arc<RouteData> {
        &self.data
    }

    /// Look up a route without parameters.
    #[must_use]
    pub fn static_match(&self, method: &Method, path: &str) -> Option<&Arc<RouteDescriptor>> {
        let path = normalize_path(path);
        self.static_routes.get(method)?.get(&path)
    }

    /// Match a path against dynamic and constrained routes.
    ///
    /// When both a regex chunk and the segment tree produce a candidate, the
    /// route registered first wins.
    #[must_use]
    pub fn dynamic_match(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);
        let by_regex = self.regex_match(method, &path);
        let by_tree = self.tree_match(method, &path);
        match (by_regex, by_tree) {
            (Some(a), Some(b)) => Some(if b.descriptor.index < a.descriptor.index { b } else { a }),
            (a, b) => a.or(b),
        }
    }

    fn regex_match(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        for chunk in self.dynamic_routes.get(method)? {
            let Some(caps) = chunk.regex.captures(path) else {
                continue;
            };
            // the highest participating group is the marker of the matched alternative
            let Some(marker) = (1..caps.len()).rev().find(|i| caps.get(*i).is_some()) else {
                continue;
            };
            let Some(route) = chunk.routes.get(&(marker + 1)) else {
                continue;
            };
            let params = route
                .parameters
                .iter()
                .filter_map(|(name, group)| {
                    caps.get(*group)
                        .map(|m| (Arc::clone(name), decode_param(m.as_str())))
                })
                .collect();
            return Some(RouteMatch {
                descriptor: Arc::clone(&route.descriptor),
                params,
            });
        }
        None
    }

    fn tree_match(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let tree = self.constrained_routes.get(method)?;
        let segments = split_segments(path);
        tree.search(&segments).map(|(leaf, params)| RouteMatch {
            descriptor: Arc::clone(&leaf.descriptor),
            params: params
                .into_iter()
                .map(|(name, value)| (name, decode_param(&value)))
                .collect(),
        })
    }

    /// Match an HTTP request to a route.
    ///
    /// Static routes are consulted first, then dynamic ones. `HEAD` requests
    /// fall back to `GET` routes.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// if let Some(m) = table.route(&Method::GET, "/users/123") {
    ///     println!("Handler: {}", m.handler());
    ///     println!("User ID: {:?}", m.get_param("id"));
    /// }
    /// ```
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();

        let mut result = self.route_exact(method, path);
        if result.is_none() && *method == Method::HEAD {
            result = self.route_exact(&Method::GET, path);
        }

        let match_duration = match_start.elapsed();
        match &result {
            Some(matched) if match_duration > Duration::from_millis(1) => warn!(
                method = %method,
                path = %path,
                handler = %matched.handler(),
                route_pattern = %matched.descriptor.path,
                path_params = ?matched.params,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            ),
            Some(matched) => debug!(
                method = %method,
                path = %path,
                handler = %matched.handler(),
                route_pattern = %matched.descriptor.path,
                path_params = ?matched.params,
                duration_us = match_duration.as_micros(),
                "Route matched"
            ),
            None => debug!(
                method = %method,
                path = %path,
                duration_us = match_duration.as_micros(),
                "No route matched"
            ),
        }
        result
    }

    fn route_exact(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        if let Some(descriptor) = self.static_match(method, path) {
            return Some(RouteMatch {
                descriptor: Arc::clone(descriptor),
                params: ParamVec::new(),
            });
        }
        self.dynamic_match(method, path)
    }

    /// Methods with a route matching `path`, sorted by name.
    ///
    /// An external dispatcher uses this to answer 405 with an `Allow` header.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let methods: BTreeMap<&str, &Method> = self
            .static_routes
            .keys()
            .chain(self.dynamic_routes.keys())
            .chain(self.constrained_routes.keys())
            .map(|m| (m.as_str(), m))
            .collect();
        methods
            .into_values()
            .filter(|m| self.route_exact(m, path).is_some())
            .cloned()
            .collect()
    }

    /// One line per compiled route, grouped by table.
    #[must_use]
    pub fn dump_routes(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (method, paths) in &self.data.static_routes {
            for (path, d) in paths {
                lines.push(format!("[static] {method} {path} -> {}", d.handler));
            }
        }
        for (method, chunks) in &self.data.dynamic_routes {
            for (i, chunk) in chunks.iter().enumerate() {
                lines.push(format!("[chunk {i}] {method} {}", chunk.regex));
                for (group_count, route) in &chunk.route_map {
                    lines.push(format!(
                        "[dynamic] {method} {} -> {} (groups={group_count})",
                        route.descriptor.path, route.descriptor.handler
                    ));
                }
            }
        }
        for (method, routes) in &self.data.constrained_routes {
            for route in routes {
                let conditions: Vec<String> = route
                    .matchers
                    .iter()
                    .enumerate()
                    .map(|(i, m)| m.condition_expression(&format!("$s{i}")))
                    .collect();
                lines.push(format!(
                    "[constrained] {method} {} -> {} if {}",
                    route.descriptor.path,
                    route.descriptor.handler,
                    conditions.join(" && ")
                ));
            }
        }
        lines
    }
}
