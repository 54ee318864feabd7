//! In-process cache store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skyquery_core::CacheError;

use crate::clock::{Clock, SystemClock};
use crate::store::{cache_key, CacheEntry, CacheStore, Payload};

/// Cache store backed by a map in memory. Entries are lost when dropped.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, query: &str) -> Result<Option<Payload>, CacheError> {
        let key = cache_key(query);
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get(&key) else {
            return Ok(None);
        };
        if entry.is_fresh(now, self.ttl) {
            return Ok(Some(entry.data.clone()));
        }

        entries.remove(&key);
        Ok(None)
    }

    fn set(&self, query: &str, payload: &Payload) -> Result<(), CacheError> {
        let entry = CacheEntry::new(self.clock.now(), payload.clone());
        self.entries.lock().insert(cache_key(query), entry);
        Ok(())
    }

    fn remove(&self, query: &str) -> Result<(), CacheError> {
        self.entries.lock().remove(&cache_key(query));
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        Ok(before - entries.len())
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
