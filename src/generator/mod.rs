//! # Route Data Generation
//!
//! Compiles a [`RouteCollection`] into [`RouteData`], the serialisable form of
//! the dispatch table:
//!
//! - **Static routes** (no parameters) go into a `method → path → descriptor`
//!   map.
//! - **Dynamic routes** whose segments can all be written as regex are grouped
//!   per method into chunks. Each chunk is one alternation regex; every
//!   alternative ends with an empty marker group `()`, so the highest capture
//!   group that participates in a match identifies the alternative. The
//!   chunk's `route_map` is keyed by that group count.
//! - **Constrained routes** (segments with expression constraints, or with a
//!   pattern that could match a `/`) keep their segment matchers and are
//!   dispatched through a segment tree.
//! - **Named routes** record either the static path or the template plus its
//!   parameter names for URL generation.
//!
//! Every descriptor carries the route's registration index; dispatch uses it
//! to honour registration order between regex and constrained candidates.
//!
//! [`CachedDataGenerator`] wraps any [`DataGenerator`] and persists its output
//! to disk.

mod cached;

#[cfg(test)]
mod tests;

pub use cached::CachedDataGenerator;

use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::CompilerConfig;
use crate::error::RoutingError;
use crate::matchers::SegmentMatcher;
use crate::route::{ParsedPath, RouteCollection, RouteDefinition};

/// Version tag written into every [`RouteData`]; caches with another version
/// are recompiled.
pub const ROUTE_DATA_FORMAT_VERSION: u32 = 1;

/// Default number of routes combined into one regex.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Compiled record for one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Registration position; lower wins when several routes match
    pub index: usize,
    /// Route name, if any
    pub name: Option<String>,
    /// Opaque handler reference
    pub handler: String,
    /// Normalised path template
    pub path: String,
}

/// A dynamic route inside a regex chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRoute {
    pub descriptor: RouteDescriptor,
    /// Parameter name and the absolute capture group holding its value
    pub parameters: Vec<(String, usize)>,
}

/// One alternation regex and the routes it dispatches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexChunk {
    /// Anchored alternation of the chunk's routes
    pub regex: String,
    /// Group count of the matched alternative → route
    pub route_map: BTreeMap<usize, DynamicRoute>,
}

/// A route with expression constraints, dispatched segment by segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstrainedRoute {
    pub descriptor: RouteDescriptor,
    /// One matcher per segment
    pub matchers: Vec<SegmentMatcher>,
    /// Parameter names indexed by parameter key
    pub parameter_names: Vec<String>,
}

/// What URL generation needs to know about a named route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamedRoute {
    /// A path without parameters
    Static(String),
    /// A template with `{param}` placeholders
    Template { path: String, params: Vec<String> },
}

/// Serialisable output of a [`DataGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteData {
    pub format_version: u32,
    pub static_routes: BTreeMap<String, BTreeMap<String, RouteDescriptor>>,
    pub dynamic_routes: BTreeMap<String, Vec<RegexChunk>>,
    pub constrained_routes: BTreeMap<String, Vec<ConstrainedRoute>>,
    pub named_routes: BTreeMap<String, NamedRoute>,
}

impl Default for RouteData {
    fn default() -> Self {
        Self {
            format_version: ROUTE_DATA_FORMAT_VERSION,
            static_routes: BTreeMap::new(),
            dynamic_routes: BTreeMap::new(),
            constrained_routes: BTreeMap::new(),
            named_routes: BTreeMap::new(),
        }
    }
}

impl RouteData {
    /// Total number of (method, route) entries across all three tables.
    #[must_use]
    pub fn route_count(&self) -> usize {
        let statics: usize = self.static_routes.values().map(BTreeMap::len).sum();
        let dynamics: usize = self
            .dynamic_routes
            .values()
            .flat_map(|chunks| chunks.iter().map(|c| c.route_map.len()))
            .sum();
        let constrained: usize = self.constrained_routes.values().map(Vec::len).sum();
        statics + dynamics + constrained
    }
}

/// Produces compiled route data.
pub trait DataGenerator {
    fn data(&self) -> Result<RouteData, RoutingError>;
}

/// Group-count-based compiler over a route collection.
#[derive(Debug, Clone)]
pub struct GroupCountBasedGenerator {
    routes: RouteCollection,
    chunk_size: usize,
}

impl GroupCountBasedGenerator {
    #[must_use]
    pub fn new(routes: RouteCollection) -> Self {
        Self {
            routes,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn from_config(routes: RouteCollection, config: &CompilerConfig) -> Self {
        Self::new(routes).with_chunk_size(config.chunk_size)
    }

    /// Routes per alternation regex; values below 1 are treated as 1.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn routes(&self) -> &RouteCollection {
        &self.routes
    }
}

struct PendingRoute {
    descriptor: RouteDescriptor,
    parsed: ParsedPath,
}

impl DataGenerator for GroupCountBasedGenerator {
    fn data(&self) -> Result<RouteData, RoutingError> {
        let mut data = RouteData::default();
        let mut dynamic: BTreeMap<String, Vec<PendingRoute>> = BTreeMap::new();

        for (index, route) in self.routes.routes().iter().enumerate() {
            let parsed = route.parse()?;
            register_name(&mut data, route, &parsed)?;

            let descriptor = RouteDescriptor {
                index,
                name: route.name.clone(),
                handler: route.handler.clone(),
                path: parsed.template.clone(),
            };

            for method in &route.methods {
                let method = method.as_str().to_string();
                if parsed.is_static() {
                    match data
                        .static_routes
                        .entry(method.clone())
                        .or_default()
                        .entry(parsed.template.clone())
                    {
                        Entry::Vacant(slot) => {
                            slot.insert(descriptor.clone());
                        }
                        Entry::Occupied(existing) => {
                            warn!(
                                method = %method,
                                path = %parsed.template,
                                handler = %route.handler,
                                shadowed_by = %existing.get().handler,
                                "Static route shadowed by an earlier registration"
                            );
                        }
                    }
                } else if parsed.needs_segment_tree() {
                    data.constrained_routes
                        .entry(method)
                        .or_default()
                        .push(ConstrainedRoute {
                            descriptor: descriptor.clone(),
                            matchers: parsed.segments.clone(),
                            parameter_names: parsed.parameter_names.clone(),
                        });
                } else {
                    dynamic.entry(method).or_default().push(PendingRoute {
                        descriptor: descriptor.clone(),
                        parsed: parsed.clone(),
                    });
                }
            }
        }

        for (method, routes) in dynamic {
            let chunks = routes
                .chunks(self.chunk_size)
                .map(build_chunk)
                .collect::<Result<Vec<_>, _>>()?;
            debug!(method = %method, chunks = chunks.len(), "Dynamic routes compiled");
            data.dynamic_routes.insert(method, chunks);
        }

        info!(
            routes_count = self.routes.len(),
            compiled_entries = data.route_count(),
            static_methods = data.static_routes.len(),
            dynamic_methods = data.dynamic_routes.len(),
            constrained_methods = data.constrained_routes.len(),
            named_routes = data.named_routes.len(),
            chunk_size = self.chunk_size,
            "Route data compiled"
        );

        Ok(data)
    }
}

fn register_name(data: &mut RouteData, route: &RouteDefinition, parsed: &ParsedPath) -> Result<(), RoutingError> {
    let Some(name) = route.name.as_ref() else {
        return Ok(());
    };
    if name.is_empty() {
        return Err(RoutingError::invalid_pattern(&route.path, "route name cannot be empty"));
    }
    let named = if parsed.parameter_names.is_empty() {
        NamedRoute::Static(parsed.template.clone())
    } else {
        NamedRoute::Template {
            path: parsed.template.clone(),
            params: parsed.parameter_names.clone(),
        }
    };
    match data.named_routes.entry(name.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(named);
            Ok(())
        }
        Entry::Occupied(_) => Err(RoutingError::DuplicateRouteName { name: name.clone() }),
    }
}

/// Combine routes into one alternation regex with marker groups.
fn build_chunk(routes: &[PendingRoute]) -> Result<RegexChunk, RoutingError> {
    let mut alternatives = Vec::with_capacity(routes.len());
    let mut route_map = BTreeMap::new();
    let mut groups_so_far = 0;

    for route in routes {
        let mut pattern = String::new();
        let mut parameters = Vec::new();
        let mut route_groups = 0;

        for matcher in &route.parsed.segments {
            let fragment = matcher.regex_fragment().ok_or_else(|| {
                RoutingError::invalid_pattern(
                    &route.descriptor.path,
                    format!("segment rule '{}' cannot be compiled to a regex", matcher.hash()),
                )
            })?;
            pattern.push('/');
            pattern.push_str(&fragment.pattern);
            for keys in &fragment.groups {
                route_groups += 1;
                for key in keys {
                    let name = route.parsed.parameter_names.get(*key).ok_or_else(|| {
                        RoutingError::malformed(format!(
                            "route '{}' has no parameter for key {key}",
                            route.descriptor.path
                        ))
                    })?;
                    parameters.push((name.clone(), groups_so_far + route_groups));
                }
            }
        }

        // marker group: its index identifies the alternative
        pattern.push_str("()");
        let marker = groups_so_far + route_groups + 1;
        alternatives.push(pattern);
        route_map.insert(
            marker + 1,
            DynamicRoute {
                descriptor: route.descriptor.clone(),
                parameters,
            },
        );
        groups_so_far = marker;
    }

    Ok(RegexChunk {
        regex: format!("^(?:{})$", alternatives.join("|")),
        route_map,
    })
}
