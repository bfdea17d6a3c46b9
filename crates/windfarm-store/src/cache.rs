//! Bounded LRU cache of result records.
//!
//! The only shared mutable state in the read path. A single mutex guards the
//! LRU (a hit reorders it, so even reads need exclusive access); hit/miss
//! counters are lock-free.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use windfarm_types::{Lookup, ResultRecord};

/// Cache statistics for the status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses); 0.0 before the first read
    pub hit_rate: f64,
}

pub struct RecordCache {
    entries: Mutex<LruCache<Lookup, Arc<ResultRecord>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecordCache {
    /// Create a cache holding at most `capacity` records (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // Poisoned locks are recovered; the LRU is never left mid-update.
    fn lock(&self) -> MutexGuard<'_, LruCache<Lookup, Arc<ResultRecord>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a record, counting the hit or miss.
    pub fn get(&self, lookup: &Lookup) -> Option<Arc<ResultRecord>> {
        let found = self.lock().get(lookup).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert a record, evicting the least recently used entry when full.
    pub fn insert(&self, record: Arc<ResultRecord>) {
        self.lock().put(record.lookup(), record);
    }

    pub fn contains(&self, lookup: &Lookup) -> bool {
        self.lock().contains(lookup)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of entry count, capacity and hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        let (entries, capacity) = {
            let cache = self.lock();
            (cache.len(), cache.cap().get())
        };
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        CacheStats {
            entries,
            capacity,
            hits,
            misses,
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use windfarm_types::{Provenance, QualityFlag, ResultType, SubjectId};

    fn record(n: u8) -> Arc<ResultRecord> {
        Arc::new(ResultRecord {
            result_type: ResultType::CapacityFactor,
            subject: SubjectId::new(n),
            metrics: BTreeMap::new(),
            provenance: Provenance {
                source_file: "capacity_factor.json".to_string(),
                source: "test".to_string(),
                generated_at: Utc::now(),
            },
            quality: QualityFlag::Ok,
        })
    }

    #[test]
    fn test_hit_and_miss_counting() {
        let cache = RecordCache::new(4);
        let r1 = record(1);
        let key = r1.lookup();

        assert!(cache.get(&key).is_none());
        cache.insert(r1);
        assert!(cache.get(&key).is_some());
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.capacity, 4);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = RecordCache::new(2);
        let (r1, r2, r3) = (record(1), record(2), record(3));
        let (k1, k2, k3) = (r1.lookup(), r2.lookup(), r3.lookup());

        cache.insert(r1);
        cache.insert(r2);
        // Touch wf1 so wf2 becomes least recently used.
        assert!(cache.get(&k1).is_some());
        cache.insert(r3);

        assert!(cache.contains(&k1));
        assert!(!cache.contains(&k2));
        assert!(cache.contains(&k3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = RecordCache::new(0);
        cache.insert(record(1));
        assert_eq!(cache.stats().capacity, 1);
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_empty_stats() {
        let stats = RecordCache::new(8).stats();
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.entries, 0);
    }
}
