//! Disk-backed memoisation of compiled route data.
//!
//! The first [`CachedDataGenerator::data`] call in a process either loads the
//! cache file or compiles through the wrapped generator and writes the file.
//! The cache has a single fixed path and no content hashing: callers
//! invalidate it with [`CachedDataGenerator::clear`] (or by deleting the file)
//! when routes change.
//!
//! Writes go to a temporary file in the target directory which is then
//! renamed over the cache path, so concurrent cold starts never observe a
//! truncated file. A cache that cannot be read or decoded, or that carries a
//! different [`ROUTE_DATA_FORMAT_VERSION`], is logged and recompiled. A cache
//! that cannot be written is a fatal [`RoutingError::CacheWrite`].

use once_cell::sync::OnceCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::{DataGenerator, RouteData, ROUTE_DATA_FORMAT_VERSION};
use crate::error::RoutingError;

/// Wraps a [`DataGenerator`] and persists its output to `path`.
pub struct CachedDataGenerator<G> {
    inner: G,
    path: PathBuf,
    memo: OnceCell<RouteData>,
}

impl<G: DataGenerator> CachedDataGenerator<G> {
    pub fn new(inner: G, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            memo: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Delete the cache file and forget the in-process copy.
    pub fn clear(&mut self) -> Result<(), RoutingError> {
        self.memo.take();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Route cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(RoutingError::CacheWrite {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Read and decode the cache file.
    pub fn read_cache(&self) -> Result<RouteData, RoutingError> {
        let bytes = fs::read(&self.path).map_err(|source| RoutingError::CacheRead {
            path: self.path.clone(),
            source,
        })?;
        let decode_err = |reason: String| RoutingError::CacheDecode {
            path: self.path.clone(),
            reason,
        };
        let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| decode_err(e.to_string()))?;
        let version = value.get("format_version").and_then(serde_json::Value::as_u64);
        if version != Some(u64::from(ROUTE_DATA_FORMAT_VERSION)) {
            return Err(decode_err(format!(
                "format version {version:?} does not match {ROUTE_DATA_FORMAT_VERSION}"
            )));
        }
        serde_json::from_value(value).map_err(|e| decode_err(e.to_string()))
    }

    /// Atomically replace the cache file with `data`.
    pub fn write_cache(&self, data: &RouteData) -> Result<(), RoutingError> {
        let write_err = |source: io::Error| RoutingError::CacheWrite {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(write_err)?;

        let bytes = serde_json::to_vec_pretty(data).map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        info!(path = %self.path.display(), bytes = bytes.len(), "Route cache written");
        Ok(())
    }

    fn load_or_compile(&self) -> Result<RouteData, RoutingError> {
        if self.path.exists() {
            match self.read_cache() {
                Ok(data) => {
                    info!(
                        path = %self.path.display(),
                        compiled_entries = data.route_count(),
                        "Route data loaded from cache"
                    );
                    return Ok(data);
                }
                Err(error) => warn!(
                    path = %self.path.display(),
                    error = %error,
                    "Route cache unusable, recompiling"
                ),
            }
        }
        let data = self.inner.data()?;
        self.write_cache(&data)?;
        Ok(data)
    }
}

impl<G: DataGenerator> DataGenerator for CachedDataGenerator<G> {
    fn data(&self) -> Result<RouteData, RoutingError> {
        self.memo.get_or_try_init(|| self.load_or_compile()).cloned()
    }
}
