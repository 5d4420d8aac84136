//! # routeforge
//!
//! **routeforge** compiles route definitions into fast lookup tables and generates
//! URLs from named routes.
//!
//! ## Overview
//!
//! A route is a method set, a path template such as `/user/{id}/edit` and a handler
//! identifier. Compilation splits the routes into three tables:
//!
//! - a static map for templates without placeholders,
//! - group-count regex chunks for routes whose segments are all regex-expressible,
//! - a segment tree for routes carrying expression constraints (`where` rules).
//!
//! The compiled [`RouteData`](generator::RouteData) is plain serde data, so it can be
//! cached on disk by [`CachedDataGenerator`](generator::CachedDataGenerator) and reused
//! across processes.
//!
//! ## Architecture
//!
//! - **[`matchers`]** - Segment matchers, conditions and the segment expression language
//! - **[`route`]** - Route definitions, path template parsing and route files
//! - **[`generator`]** - Route data compilation and the on-disk cache
//! - **[`router`]** - Request resolution against compiled data
//! - **[`url_generator`]** - URL generation for named routes
//! - **[`config`]** - Environment-driven compiler settings
//! - **[`logging`]** - Structured logging setup for binaries
//! - **[`cli`]** - The `routeforge` command-line front end
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use routeforge::route::{RouteCollection, RouteDefinition};
//! use routeforge::router::RouteTable;
//! use routeforge::url_generator::UrlGenerator;
//!
//! # fn main() -> Result<(), routeforge::RoutingError> {
//! let routes: RouteCollection = vec![
//!     RouteDefinition::new(Method::GET, "/user/{id}/edit", "users.edit").named("user_edit"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let table = RouteTable::compile(&routes)?;
//! let url = UrlGenerator::from_table(&table).generate("user_edit", [("id", 123)], false)?;
//! assert_eq!(url, "/user/123/edit");
//!
//! let matched = table.route(&Method::GET, &url).unwrap();
//! assert_eq!(matched.handler(), "users.edit");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod matchers;
pub mod route;
pub mod router;
pub mod url_generator;

pub use error::{Result, RoutingError};
pub use generator::{CachedDataGenerator, DataGenerator, GroupCountBasedGenerator, RouteData};
pub use route::{RouteCollection, RouteDefinition};
pub use router::{RouteMatch, RouteTable};
pub use url_generator::{RequestContext, UrlGenerator};
