//! # Router Module
//!
//! The router module turns compiled [`RouteData`](crate::generator::RouteData)
//! into a [`RouteTable`] and resolves `(method, path)` pairs against it.
//!
//! ## Architecture
//!
//! The table has three parts, consulted in this order:
//!
//! 1. **Static map**: `method → path → descriptor`, a single hash lookup.
//! 2. **Group-count regex chunks**: each chunk is one alternation regex over
//!    up to `chunk_size` routes. Every alternative ends with an empty marker
//!    group, so the highest capture group that participated in the match
//!    identifies the route; its parameters are read from fixed group indices.
//! 3. **Segment tree**: routes with expression constraints are matched one
//!    segment at a time by their [`SegmentMatcher`](crate::matchers::SegmentMatcher)s,
//!    with identical matchers from different routes merged into shared nodes.
//!
//! When parts 2 and 3 both match, the route registered first wins.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use routeforge::route::RouteCollection;
//! use routeforge::router::RouteTable;
//!
//! # fn main() -> Result<(), routeforge::RoutingError> {
//! let mut routes = RouteCollection::new();
//! routes.get("/user/{id}/edit", "users.edit").name = Some("user_edit".into());
//!
//! let table = RouteTable::compile(&routes)?;
//! let matched = table.route(&Method::GET, "/user/123/edit").unwrap();
//! assert_eq!(matched.handler(), "users.edit");
//! assert_eq!(matched.get_param("id"), Some("123"));
//! # Ok(())
//! # }
//! ```

mod core;
mod tree;

pub use core::{ParamVec, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
