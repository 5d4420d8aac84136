//! # URL Generation
//!
//! [`UrlGenerator`] is the inverse of dispatch: given a route name and
//! parameter values it produces the path (or absolute URL) that would be
//! routed back to that route.
//!
//! - Static routes return their path unchanged.
//! - Templates have each `{param}` / `{param:regex}` placeholder replaced by
//!   the percent-encoded value; a missing value is
//!   [`RoutingError::MissingParameter`].
//! - Supplied values that the template does not use become the query string,
//!   sorted by key.
//! - With a [`RequestContext`] attached, the request's base path is prefixed
//!   and absolute URLs can be produced; without one, only root-relative paths
//!   are generated.
//!
//! ```rust
//! use http::Method;
//! use routeforge::route::{RouteCollection, RouteDefinition};
//! use routeforge::router::RouteTable;
//! use routeforge::url_generator::UrlGenerator;
//!
//! # fn main() -> Result<(), routeforge::RoutingError> {
//! let routes: RouteCollection =
//!     [RouteDefinition::new(Method::GET, "/user/{id}/edit", "users.edit").named("user_edit")]
//!         .into_iter()
//!         .collect();
//! let table = RouteTable::compile(&routes)?;
//! let urls = UrlGenerator::from_table(&table);
//! assert_eq!(urls.generate("user_edit", [("id", 123)], false)?, "/user/123/edit");
//! # Ok(())
//! # }
//! ```


use http::Uri;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::RoutingError;
use crate::generator::{NamedRoute, RouteData};
use crate::router::RouteTable;

/// Where the current request was served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub scheme: String,
    pub host: String,
    /// Explicit port; omitted from URLs when it is the scheme's default
    pub port: Option<u16>,
    /// Prefix for every generated path, without a trailing `/` (may be empty)
    pub base_path: String,
}

impl RequestContext {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: None,
            base_path: String::new(),
        }
    }

    /// Derive the base path from the front controller's script path:
    /// `/app/index.php` gives `/app`, `/index.php` gives an empty base.
    pub fn from_script_name(scheme: impl Into<String>, host: impl Into<String>, script_name: &str) -> Self {
        let base = script_name
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or_default()
            .trim_end_matches('/');
        Self::new(scheme, host).with_base_path(base)
    }

    /// Take scheme, host and port from a request URI.
    #[must_use]
    pub fn from_uri(uri: &Uri, script_name: &str) -> Self {
        let scheme = uri.scheme_str().unwrap_or("http");
        let host = uri.host().unwrap_or("localhost");
        let mut context = Self::from_script_name(scheme, host, script_name);
        context.port = uri.port_u16();
        context
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        let trimmed = base_path.trim_end_matches('/');
        self.base_path = if trimmed.is_empty() || trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        self
    }

    fn origin(&self) -> String {
        let default_port = match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };
        match self.port {
            Some(port) if Some(port) != default_port => format!("{}://{}:{port}", self.scheme, self.host),
            _ => format!("{}://{}", self.scheme, self.host),
        }
    }
}

/// Generates URLs for named routes of a compiled table.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    data: Arc<RouteData>,
    context: Option<RequestContext>,
}

impl UrlGenerator {
    #[must_use]
    pub fn new(data: Arc<RouteData>) -> Self {
        Self { data, context: None }
    }

    #[must_use]
    pub fn from_table(table: &RouteTable) -> Self {
        Self::new(Arc::clone(table.data()))
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    /// Generate the URL for route `name`.
    ///
    /// `absolute` only has an effect when a [`RequestContext`] is attached.
    pub fn generate<K, V>(
        &self,
        name: &str,
        params: impl IntoIterator<Item = (K, V)>,
        absolute: bool,
    ) -> Result<String, RoutingError>
    where
        K: Into<String>,
        V: ToString,
    {
        let mut params: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();

        let route = self
            .data
            .named_routes
            .get(name)
            .ok_or_else(|| RoutingError::RouteNotFound { name: name.to_string() })?;

        let mut path = match route {
            NamedRoute::Static(path) => path.clone(),
            NamedRoute::Template { path, params: required } => {
                if let Some(missing) = required.iter().find(|p| !params.contains_key(*p)) {
                    return Err(RoutingError::MissingParameter {
                        route: name.to_string(),
                        parameter: missing.clone(),
                    });
                }
                let filled = fill_template(path, &params);
                for used in required {
                    params.remove(used);
                }
                filled
            }
        };

        if !params.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            path.push('?');
            path.push_str(&query);
        }

        let url = match &self.context {
            Some(context) if absolute => format!("{}{}{path}", context.origin(), context.base_path),
            Some(context) => format!("{}{path}", context.base_path),
            None => path,
        };
        debug!(route = %name, url = %url, absolute, "URL generated");
        Ok(url)
    }
}

/// Replace every placeholder of `template` with its encoded value.
fn fill_template(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut depth = 1;
        let mut body = String::new();
        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth == 0 {
                break;
            }
            body.push(c);
        }
        let name = body.split_once(':').map_or(body.as_str(), |(n, _)| n).trim();
        if let Some(value) = params.get(name) {
            out.push_str(&urlencoding::encode(value));
        }
    }
    out
}
