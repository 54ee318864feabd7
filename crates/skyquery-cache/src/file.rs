//! File-backed cache store.
//!
//! One JSON record per query, named by the query's SHA-256 key, inside a
//! directory that is validated when the store is built. Records are written
//! to a temporary file and renamed into place so readers in other threads
//! or processes never see a partial write.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use skyquery_core::{CacheError, ConfigError};

use crate::clock::{Clock, SystemClock};
use crate::store::{cache_key, is_cache_key, is_fresh, CacheEntry, CacheEntryRef, CacheStore, Payload};

const TEMP_PREFIX: &str = ".tmp-";
const PROBE_PREFIX: &str = ".probe-";

/// Cache store persisting entries as files in a directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    /// Open a cache in `dir`, which must already exist and be readable and writable.
    ///
    /// # Errors
    /// Returns `ConfigError` if the directory is missing, not a directory,
    /// or not accessible for reading and writing.
    pub fn new(dir: impl AsRef<Path>, ttl: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(dir, ttl, Arc::new(SystemClock))
    }

    /// Like [`FileCache::new`] but with an explicit time source.
    pub fn with_clock(
        dir: impl AsRef<Path>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let dir = dir.as_ref().to_path_buf();
        validate_dir(&dir)?;

        tracing::debug!(dir = %dir.display(), ttl_secs = ttl.as_secs(), "Opened file cache");
        Ok(Self { dir, ttl, clock })
    }

    fn entry_path(&self, query: &str) -> PathBuf {
        self.dir.join(cache_key(query))
    }

    /// Read and decode a record. Undecodable records count as absent.
    fn read_entry(&self, path: &Path) -> Result<Option<CacheEntry>, CacheError> {
        let contents = match fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };

        match serde_json::from_slice::<CacheEntry>(&contents) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache record {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Best-effort removal of an expired record; failures are only logged.
    fn reclaim(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!("Reclaimed expired cache record {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to reclaim expired cache record {}: {}",
                path.display(),
                e
            ),
        }
    }

    /// Paths of every record in the directory, skipping temp and probe files.
    fn record_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let name = entry.file_name();
            if name.to_str().is_some_and(is_cache_key) {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }
}

fn validate_dir(dir: &Path) -> Result<(), ConfigError> {
    let meta = match fs::metadata(dir) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(dir.to_path_buf()))
        }
        Err(_) => return Err(ConfigError::NotReadable(dir.to_path_buf())),
    };

    if !meta.is_dir() {
        return Err(ConfigError::NotADirectory(dir.to_path_buf()));
    }

    if fs::read_dir(dir).is_err() {
        return Err(ConfigError::NotReadable(dir.to_path_buf()));
    }

    if meta.permissions().readonly() {
        return Err(ConfigError::NotWritable(dir.to_path_buf()));
    }

    // Permission bits don't tell the whole story (ACLs, read-only mounts).
    tempfile::Builder::new()
        .prefix(PROBE_PREFIX)
        .tempfile_in(dir)
        .map_err(|_| ConfigError::NotWritable(dir.to_path_buf()))?;

    Ok(())
}

impl CacheStore for FileCache {
    fn get(&self, query: &str) -> Result<Option<Payload>, CacheError> {
        let path = self.entry_path(query);

        let Some(entry) = self.read_entry(&path)? else {
            tracing::debug!("Cache miss for {}", path.display());
            return Ok(None);
        };

        if !entry.is_fresh(self.clock.now(), self.ttl) {
            tracing::debug!("Cache entry expired for {}", path.display());
            self.reclaim(&path);
            return Ok(None);
        }

        tracing::debug!("Cache hit for {}", path.display());
        Ok(Some(entry.data))
    }

    fn set(&self, query: &str, payload: &Payload) -> Result<(), CacheError> {
        let path = self.entry_path(query);
        let record = CacheEntryRef {
            time: self.clock.now().timestamp(),
            data: payload,
        };
        let bytes = serde_json::to_vec(&record)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| CacheError::io(&self.dir, e))?;
        tmp.write_all(&bytes)
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| CacheError::io(&path, e.error))?;

        tracing::debug!("Cached {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }

    fn remove(&self, query: &str) -> Result<(), CacheError> {
        let path = self.entry_path(query);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&path, e)),
        }
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut removed = 0;

        for path in self.record_paths()? {
            let expired = match self.read_entry(&path)? {
                Some(entry) => !is_fresh(entry.time, now, self.ttl),
                None => true,
            };
            if expired {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(CacheError::io(&path, e)),
                }
            }
        }

        tracing::info!("Purged {} expired cache records", removed);
        Ok(removed)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.record_paths()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(&path, e)),
            }
        }
        tracing::info!("Cleared {} cache records", removed);
        Ok(removed)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
