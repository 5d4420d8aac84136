//! Error types for route compilation, dispatch-table loading and URL generation.
//!
//! Every failure is reported synchronously at the call site that detects it.
//! Compilation is deterministic, so nothing in this crate retries.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Errors raised while building matchers, compiling routes, loading a cached
/// route table or generating URLs.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A static segment contains `/`, a regex does not compile, or a path
    /// template is malformed. Fatal to that route registration.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending literal, regex or template
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Two matchers with different matching rules were asked to merge.
    #[error("cannot merge incompatible matchers '{left}' and '{right}'")]
    IncompatibleMatcher {
        /// Hash of the receiving matcher
        left: String,
        /// Hash of the matcher being merged in
        right: String,
    },

    /// URL generation was requested for a route name that is not in the table.
    #[error("route '{name}' does not exist")]
    RouteNotFound {
        /// The requested route name
        name: String,
    },

    /// URL generation is missing a parameter required by the route template.
    #[error("missing required parameter '{parameter}' for route '{route}'")]
    MissingParameter {
        /// The route being generated
        route: String,
        /// The parameter that was not supplied
        parameter: String,
    },

    /// The route cache file could not be written.
    #[error("failed to write route cache '{}': {source}", path.display())]
    CacheWrite {
        /// Cache file path
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: io::Error,
    },

    /// The route cache file exists but could not be read.
    #[error("failed to read route cache '{}': {source}", path.display())]
    CacheRead {
        /// Cache file path
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: io::Error,
    },

    /// The route cache file was read but is not a usable route table.
    #[error("route cache '{}' is unusable: {reason}", path.display())]
    CacheDecode {
        /// Cache file path
        path: PathBuf,
        /// Decode failure or version mismatch
        reason: String,
    },

    /// Route data references alternatives or names that do not exist.
    #[error("malformed route table: {reason}")]
    MalformedRouteTable {
        /// Description of the inconsistency
        reason: String,
    },

    /// Two routes were registered under the same name.
    #[error("route name '{name}' is registered more than once")]
    DuplicateRouteName {
        /// The duplicated name
        name: String,
    },

    /// A route collection file could not be read or parsed.
    #[error("failed to load routes from '{}': {reason}", path.display())]
    RouteLoad {
        /// Route file path
        path: PathBuf,
        /// Read or parse failure
        reason: String,
    },
}

impl RoutingError {
    pub(crate) fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        RoutingError::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RoutingError::MalformedRouteTable {
            reason: reason.into(),
        }
    }
}
