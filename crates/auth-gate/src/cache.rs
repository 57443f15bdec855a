//! Capacity-bounded cache with per-entry timeout.
//!
//! Entries expire a fixed interval after their last read - a read re-arms
//! the timer - and the least-recently-used entry is evicted when the
//! cache is full. Expired entries are dropped lazily on access; there is
//! no background sweeper to manage.
//!
//! Recency is tracked with a monotonic counter rather than timestamps so
//! ordering stays exact under `tokio::time::pause`.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    touched: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    clock: u64,
}

/// Async LRU cache whose entries also time out individually.
pub struct TimeoutCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    capacity: usize,
    timeout: Duration,
}

impl<K, V> TimeoutCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries, each living
    /// `timeout` past its last read.
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
            capacity,
            timeout,
        }
    }

    /// Look up a key. A hit re-arms the entry's timeout; an expired entry
    /// is removed and reported as a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        let expired = matches!(inner.entries.get(key), Some(entry) if entry.expires_at <= now);
        if expired {
            inner.entries.remove(key);
            return None;
        }

        inner.clock += 1;
        let clock = inner.clock;
        let timeout = self.timeout;
        let entry = inner.entries.get_mut(key)?;
        entry.expires_at = now + timeout;
        entry.touched = clock;
        Some(entry.value.clone())
    }

    /// Insert or replace a value.
    ///
    /// Returns the value evicted to make room, if the insert pushed the
    /// cache over capacity.
    pub async fn insert(&self, key: K, value: V) -> Option<V> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        inner.clock += 1;
        let clock = inner.clock;
        let timeout = self.timeout;
        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + timeout,
                touched: clock,
            },
        );

        if inner.entries.len() <= self.capacity {
            return None;
        }

        // Prefer dropping an already-expired entry over a live one
        let victim = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(k, _)| k.clone())
            .next()
            .or_else(|| {
                inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.touched)
                    .map(|(k, _)| k.clone())
            })?;

        inner.entries.remove(&victim).map(|entry| entry.value)
    }

    /// Number of entries currently stored, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// `true` when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }
}
