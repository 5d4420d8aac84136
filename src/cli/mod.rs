//! # CLI Module
//!
//! Command-line front end for compiling and exercising route files.
//!
//! ## Commands
//!
//! ### `compile`
//!
//! Compile a route file, optionally through the cache:
//!
//! ```bash
//! routeforge compile --routes routes.yaml --cache target/routes.cache.json
//! ```
//!
//! ### `match`
//!
//! Resolve a request and print the handler and parameters:
//!
//! ```bash
//! routeforge match --routes routes.yaml GET /user/123/edit
//! ```
//!
//! ### `url`
//!
//! Generate the URL of a named route:
//!
//! ```bash
//! routeforge url --routes routes.yaml user_edit id=123
//! routeforge url --routes routes.yaml user_edit id=123 --absolute --host example.com
//! ```
//!
//! ### `dump`
//!
//! Print the static map, the regex chunks and the constrained routes:
//!
//! ```bash
//! routeforge dump --routes routes.yaml
//! ```
//!
//! ## Route files
//!
//! ```yaml
//! routes:
//!   - name: user_edit
//!     path: /user/{id}/edit
//!     handler: users.edit
//!     methods: [GET]
//!     where:
//!       id: numeric
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands};
