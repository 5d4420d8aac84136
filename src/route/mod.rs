//! # Route Definitions
//!
//! A [`RouteDefinition`] is the declarative input to compilation: an optional
//! unique name, the HTTP methods it answers, a path template and an opaque
//! handler reference. A [`RouteCollection`] keeps definitions in registration
//! order, which is also their dispatch priority.
//!
//! Collections can be built in code or loaded from YAML / JSON:
//!
//! ```yaml
//! routes:
//!   - name: user_edit
//!     methods: [GET, POST]
//!     path: /user/{id}/edit
//!     handler: users.edit
//!     where:
//!       id: numeric
//! ```

mod parser;

#[cfg(test)]
mod tests;

pub use parser::{normalize_path, parse_path, split_segments, ParsedPath, DEFAULT_PARAMETER_PATTERN};

use http::Method;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::RoutingError;

/// One declared route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    /// Unique name used for URL generation
    pub name: Option<String>,
    /// Methods the route answers
    pub methods: Vec<Method>,
    /// Path template, e.g. `/users/{id:\d+}`
    pub path: String,
    /// Opaque handler reference passed through to the dispatcher
    pub handler: String,
    /// Expression constraints keyed by parameter name
    pub constraints: BTreeMap<String, String>,
}

impl RouteDefinition {
    pub fn new(method: Method, path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            name: None,
            methods: vec![method],
            path: path.into(),
            handler: handler.into(),
            constraints: BTreeMap::new(),
        }
    }

    /// Give the route a name for URL generation.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Also answer `method`.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    /// Require the segment holding `parameter` to satisfy `expression`
    /// (see [`crate::matchers::SegmentExpression`]).
    #[must_use]
    pub fn where_expression(mut self, parameter: impl Into<String>, expression: impl Into<String>) -> Self {
        self.constraints.insert(parameter.into(), expression.into());
        self
    }

    /// Parse the path template into segment matchers.
    pub fn parse(&self) -> Result<ParsedPath, RoutingError> {
        parse_path(&self.path, &self.constraints)
    }
}

/// Ordered set of route definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteCollection {
    routes: Vec<RouteDefinition>,
}

macro_rules! method_helper {
    ($fn_name:ident, $method:expr) => {
        #[doc = concat!("Register a `", stringify!($method), "` route and return it for further configuration.")]
        pub fn $fn_name(&mut self, path: impl Into<String>, handler: impl Into<String>) -> &mut RouteDefinition {
            self.add(RouteDefinition::new($method, path, handler))
        }
    };
}

impl RouteCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route; returns it so it can be renamed or constrained in place.
    pub fn add(&mut self, route: RouteDefinition) -> &mut RouteDefinition {
        self.routes.push(route);
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    method_helper!(get, Method::GET);
    method_helper!(post, Method::POST);
    method_helper!(put, Method::PUT);
    method_helper!(patch, Method::PATCH);
    method_helper!(delete, Method::DELETE);

    #[must_use]
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Load a collection from a YAML (`.yaml`/`.yml`) or JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RoutingError> {
        let path = path.as_ref();
        let load_err = |reason: String| RoutingError::RouteLoad {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let is_yaml = path
            .extension()
            .map(|s| s == "yaml" || s == "yml")
            .unwrap_or(false);
        let file: RouteFile = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| load_err(e.to_string()))?
        } else {
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?
        };
        file.into_collection().map_err(load_err)
    }

    /// Parse a YAML document in the route-file format.
    pub fn from_yaml_str(content: &str) -> Result<Self, RoutingError> {
        let file: RouteFile = serde_yaml::from_str(content).map_err(|e| RoutingError::RouteLoad {
            path: "<inline>".into(),
            reason: e.to_string(),
        })?;
        file.into_collection().map_err(|reason| RoutingError::RouteLoad {
            path: "<inline>".into(),
            reason,
        })
    }
}

impl FromIterator<RouteDefinition> for RouteCollection {
    fn from_iter<I: IntoIterator<Item = RouteDefinition>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteFile {
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_methods")]
    methods: Vec<String>,
    path: String,
    handler: String,
    #[serde(default, rename = "where")]
    constraints: BTreeMap<String, String>,
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string()]
}

impl RouteFile {
    fn into_collection(self) -> Result<RouteCollection, String> {
        self.routes
            .into_iter()
            .map(|entry| {
                let methods = entry
                    .methods
                    .iter()
                    .map(|m| {
                        Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                            .map_err(|_| format!("invalid HTTP method '{m}' on route '{}'", entry.path))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                if methods.is_empty() {
                    return Err(format!("route '{}' declares no methods", entry.path));
                }
                Ok(RouteDefinition {
                    name: entry.name,
                    methods,
                    path: entry.path,
                    handler: entry.handler,
                    constraints: entry.constraints,
                })
            })
            .collect()
    }
}
