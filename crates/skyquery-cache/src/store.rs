//! Cache store contract and record format.
//!
//! Every implementation addresses entries by [`cache_key`] of the exact
//! query string and applies one TTL to all entries: an entry is fresh iff
//! `now - time < ttl`, and stale entries behave as if they were absent.
//!
//! `time` is stored in whole seconds, truncated, while `now` is compared at
//! millisecond precision. An entry written at a fractional second can
//! therefore expire up to one second before its nominal TTL, never after.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

use skyquery_core::CacheError;

/// Default time-to-live for cached entries (one hour).
///
/// Effective lifetime is between `ttl - 1s` and `ttl`, see the module docs.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// A cached result blob: a JSON object with string keys.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Persisted record: when it was written plus the payload itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Seconds since the Unix epoch at write time
    pub time: i64,
    pub data: Payload,
}

impl CacheEntry {
    pub fn new(stored_at: DateTime<Utc>, data: Payload) -> Self {
        Self {
            time: stored_at.timestamp(),
            data,
        }
    }

    /// Whether the entry is still within `ttl` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        is_fresh(self.time, now, ttl)
    }
}

/// Borrowed form of [`CacheEntry`] so writes don't need to clone the payload.
#[derive(Serialize)]
pub(crate) struct CacheEntryRef<'a> {
    pub time: i64,
    pub data: &'a Payload,
}

pub(crate) fn is_fresh(stored_secs: i64, now: DateTime<Utc>, ttl: Duration) -> bool {
    let age_ms = i128::from(now.timestamp_millis()) - i128::from(stored_secs) * 1000;
    age_ms < i128::try_from(ttl.as_millis()).unwrap_or(i128::MAX)
}

/// Derive the storage key for a query: lowercase hex SHA-256 of its bytes.
pub fn cache_key(query: &str) -> String {
    hex::encode(Sha256::digest(query.as_bytes()))
}

/// Whether `name` has the shape of a key produced by [`cache_key`].
pub(crate) fn is_cache_key(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Query-addressed result store with a single TTL.
///
/// Implementations must be safe to share between threads. Concurrent
/// writers to the same query race; the last write wins. Write times are
/// kept in whole seconds, so an entry may expire up to one second early.
pub trait CacheStore: Send + Sync {
    /// Returns the payload stored for `query`, or `None` if there is no
    /// entry or it has expired.
    ///
    /// # Errors
    /// Returns `CacheError` on a storage fault other than a missing entry.
    fn get(&self, query: &str) -> Result<Option<Payload>, CacheError>;

    /// Stores `payload` for `query`, replacing any previous entry.
    ///
    /// # Errors
    /// Returns `CacheError` if the entry could not be persisted.
    fn set(&self, query: &str, payload: &Payload) -> Result<(), CacheError>;

    /// Drops the entry for `query` if there is one.
    fn remove(&self, query: &str) -> Result<(), CacheError>;

    /// Physically removes every expired entry. Returns how many were removed.
    fn purge_expired(&self) -> Result<usize, CacheError>;

    /// Removes every entry. Returns how many were removed.
    fn clear(&self) -> Result<usize, CacheError>;

    /// The TTL applied to every entry.
    fn ttl(&self) -> Duration;
}
