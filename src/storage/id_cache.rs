// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for public id → internal id lookups.
//!
//! Public ids are assigned once and never reassigned, so entries never go
//! stale and need no TTL. Only ids of committed rows are inserted.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

const MIN_CAPACITY: NonZeroUsize = NonZeroUsize::MIN;

/// In-process LRU cache of resolved public ids.
pub struct IdCache {
    cache: Mutex<LruCache<String, u64>>,
}

impl IdCache {
    /// Create a new cache holding at most `capacity` ids.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(MIN_CAPACITY),
            )),
        }
    }

    pub fn get(&self, public_id: &str) -> Option<u64> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(public_id).copied()
    }

    pub fn put(&self, public_id: &str, id: u64) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(public_id.to_string(), id);
        }
    }

    /// Number of cached ids.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let cache = IdCache::new(10);
        cache.put("wal_a", 7);
        assert_eq!(cache.get("wal_a"), Some(7));
        assert_eq!(cache.get("wal_b"), None);
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = IdCache::new(2);
        cache.put("wal_a", 1);
        cache.put("wal_b", 2);
        cache.get("wal_a");
        cache.put("wal_c", 3);

        assert_eq!(cache.get("wal_b"), None);
        assert_eq!(cache.get("wal_a"), Some(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_falls_back_to_one() {
        let cache = IdCache::new(0);
        cache.put("wal_a", 1);
        cache.put("wal_b", 2);
        assert_eq!(cache.len(), 1);
    }
}
