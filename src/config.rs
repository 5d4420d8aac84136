//! # Compiler Configuration
//!
//! Environment-variable configuration for route compilation.
//!
//! ## Environment Variables
//!
//! ### `ROUTEFORGE_CHUNK_SIZE`
//!
//! Number of dynamic routes combined into one alternation regex. Accepts
//! decimal (`10`) or hexadecimal (`0xa`). Default: `10`.
//!
//! Larger chunks mean fewer regex evaluations per dispatch but bigger compiled
//! programs; the regex engine's size limit caps how far this can go.
//!
//! ### `ROUTEFORGE_CACHE_PATH`
//!
//! File used by [`CachedDataGenerator`](crate::generator::CachedDataGenerator)
//! to persist compiled route data. Unset means no cache.
//!
//! ### `ROUTEFORGE_CACHE`
//!
//! `off` disables the cache even when a path is set. Default: `on`.
//!
//! ## Usage
//!
//! ```rust
//! use routeforge::config::CompilerConfig;
//!
//! let config = CompilerConfig::from_env();
//! println!("Chunk size: {}", config.chunk_size);
//! ```

use std::env;
use std::path::PathBuf;

use crate::generator::DEFAULT_CHUNK_SIZE;

/// Route compilation settings loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Routes per alternation regex (default: 10)
    pub chunk_size: usize,
    /// Cache file for compiled route data
    pub cache_path: Option<PathBuf>,
    /// Whether the cache file is used at all
    pub cache_enabled: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cache_path: None,
            cache_enabled: true,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let chunk_size = match lookup("ROUTEFORGE_CHUNK_SIZE") {
            Some(val) => {
                let parsed = if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).ok()
                } else {
                    val.parse().ok()
                };
                parsed.filter(|n| *n > 0).unwrap_or(DEFAULT_CHUNK_SIZE)
            }
            None => DEFAULT_CHUNK_SIZE,
        };
        let cache_path = lookup("ROUTEFORGE_CACHE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let cache_enabled = lookup("ROUTEFORGE_CACHE")
            .map(|v| !matches!(v.to_lowercase().as_str(), "off" | "false" | "0"))
            .unwrap_or(true);
        CompilerConfig {
            chunk_size,
            cache_path,
            cache_enabled,
        }
    }

    /// The cache path when caching is enabled.
    #[must_use]
    pub fn effective_cache_path(&self) -> Option<&PathBuf> {
        self.cache_path.as_ref().filter(|_| self.cache_enabled)
    }
}
