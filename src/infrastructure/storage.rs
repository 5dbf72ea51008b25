//! Storage for fingerprint timestamps.
//!
//! Provides concurrent, sharded storage for tracking when each fingerprint
//! was last forwarded.

use crate::application::ports::ExpiryStore;
use crate::domain::fingerprint::Fingerprint;
use ahash::RandomState;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Thread-safe sharded storage backed by DashMap.
///
/// Every shard sits behind its own reader/writer lock: lookups share a
/// shard, records take it exclusively, and a sweep locks each shard in turn
/// so traffic on other shards keeps flowing.
#[derive(Debug)]
pub struct ShardedStorage {
    map: DashMap<Fingerprint, Instant, RandomState>,
}

impl ShardedStorage {
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Check if a fingerprint is tracked.
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.map.contains_key(fingerprint)
    }

    /// Stop tracking a fingerprint.
    pub fn remove(&self, fingerprint: &str) -> Option<Instant> {
        self.map.remove(fingerprint).map(|(_, seen_at)| seen_at)
    }
}

impl Default for ShardedStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpiryStore for ShardedStorage {
    fn lookup(&self, fingerprint: &str) -> Option<Instant> {
        self.map.get(fingerprint).map(|entry| *entry.value())
    }

    fn record(&self, fingerprint: &str, seen_at: Instant) {
        // Only allocate a key for fingerprints not yet tracked.
        if let Some(mut entry) = self.map.get_mut(fingerprint) {
            *entry = seen_at;
            return;
        }
        self.map.insert(Fingerprint::from(fingerprint), seen_at);
    }

    fn sweep(&self, now: Instant, expire_after: Duration) -> usize {
        let mut evicted = 0;
        self.map.retain(|_, seen_at| {
            let keep = now.saturating_duration_since(*seen_at) <= expire_after;
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_basic_operations() {
        let storage = ShardedStorage::new();
        let now = Instant::now();

        storage.record("a=1\n", now);
        storage.record("b=2\n", now);

        assert_eq!(storage.lookup("a=1\n"), Some(now));
        assert!(storage.lookup("c=3\n").is_none());
        assert_eq!(storage.len(), 2);
        assert!(!storage.is_empty());
    }

    #[test]
    fn test_record_overwrites() {
        let storage = ShardedStorage::new();
        let first = Instant::now();
        let later = first + Duration::from_secs(5);

        storage.record("k=v\n", first);
        storage.record("k=v\n", later);

        assert_eq!(storage.lookup("k=v\n"), Some(later));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_remove() {
        let storage = ShardedStorage::new();
        let now = Instant::now();

        storage.record("k=v\n", now);
        assert!(storage.contains("k=v\n"));

        assert_eq!(storage.remove("k=v\n"), Some(now));
        assert!(!storage.contains("k=v\n"));
    }

    #[test]
    fn test_sweep_removes_only_stale() {
        let storage = ShardedStorage::new();
        let start = Instant::now();

        storage.record("stale\n", start);
        storage.record("edge\n", start + Duration::from_secs(40));
        storage.record("fresh\n", start + Duration::from_secs(90));

        let now = start + Duration::from_secs(100);
        assert_eq!(storage.sweep(now, Duration::from_secs(60)), 1);

        assert!(!storage.contains("stale\n"));
        // Exactly 60s old is kept; only strictly older entries go
        assert!(storage.contains("edge\n"));
        assert!(storage.contains("fresh\n"));
    }

    #[test]
    fn test_sweep_empty() {
        let storage = ShardedStorage::new();
        assert_eq!(storage.sweep(Instant::now(), Duration::from_secs(60)), 0);
    }

    #[test]
    fn test_clear() {
        let storage = ShardedStorage::new();
        let now = Instant::now();

        storage.record("a\n", now);
        storage.record("b\n", now);
        assert_eq!(storage.len(), 2);

        storage.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let storage = Arc::new(ShardedStorage::new());
        let now = Instant::now();
        let mut handles = vec![];

        for i in 0..10 {
            let storage_clone = Arc::clone(&storage);
            let handle = thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key_{}_{}\n", i, j);
                    storage_clone.record(&key, now);
                    assert_eq!(storage_clone.lookup(&key), Some(now));
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.len(), 1000);
    }

    #[test]
    fn test_concurrent_sweep_and_record() {
        use std::thread;

        let storage = Arc::new(ShardedStorage::new());
        let start = Instant::now();
        for i in 0..500 {
            storage.record(&format!("old_{}\n", i), start);
        }

        let writer = {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for i in 0..500 {
                    storage.record(&format!("new_{}\n", i), start + Duration::from_secs(120));
                }
            })
        };

        let sweeper = {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                storage.sweep(start + Duration::from_secs(120), Duration::from_secs(60))
            })
        };

        writer.join().unwrap();
        let evicted = sweeper.join().unwrap();

        assert_eq!(evicted, 500);
        assert_eq!(storage.len(), 500);
    }
}
