//! Local cache file for the raw inventory document.
//!
//! The cache stores the service response verbatim, one file per distinct
//! set of requested work groups. Writes go through a temporary file in the
//! cache directory that is renamed over the target, so a reader never sees
//! a partially written document.
//!
//! # Example
//!
//! ```rust,ignore
//! use conductor_inventory::inventory::CacheStore;
//! use std::time::Duration;
//!
//! let store = CacheStore::new("/var/cache/conductor", &["infra".to_string()]);
//! if store.is_fresh(Duration::from_secs(3600)) {
//!     let raw = store.read()?;
//! }
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::trace;

use crate::error::{Error, Result};

/// File name prefix of every cache file
pub const CACHE_FILE_PREFIX: &str = "conductor_cache";

/// Reads and writes the cached inventory document for one work group selection
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    path: PathBuf,
}

impl CacheStore {
    /// Create a store for the given cache directory and work group selection
    pub fn new(dir: impl Into<PathBuf>, work_groups: &[String]) -> Self {
        let dir = dir.into();
        let path = Self::filename(&dir, work_groups);
        Self { dir, path }
    }

    /// Cache file path for a work group selection
    ///
    /// Names are sorted and deduplicated, so the same selection always maps
    /// to the same file whatever order it was configured in.
    pub fn filename(dir: &Path, work_groups: &[String]) -> PathBuf {
        let mut names: Vec<&str> = work_groups.iter().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();

        let safe: Vec<String> = names
            .iter()
            .map(|n| n.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_"))
            .collect();

        dir.join(format!("{}_{}.json", CACHE_FILE_PREFIX, safe.join("_")))
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Last modification time of the cache file, if it can be read
    pub fn modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
    }

    /// Age of the cache file; a modification time in the future counts as zero
    pub fn age(&self) -> Option<Duration> {
        self.modified()
            .map(|mtime| SystemTime::now().duration_since(mtime).unwrap_or(Duration::ZERO))
    }

    /// Whether the cache file exists and is no older than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        match self.age() {
            Some(age) => {
                trace!(path = %self.path.display(), ?age, ?ttl, "checked cache age");
                age <= ttl
            }
            None => false,
        }
    }

    /// Read the cached document verbatim
    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|source| Error::LocalCache {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the cached document
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.write_atomic(data).map_err(|source| Error::CacheWrite {
            path: self.path.clone(),
            source,
        })
    }

    fn write_atomic(&self, data: &[u8]) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}", CACHE_FILE_PREFIX))
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}
