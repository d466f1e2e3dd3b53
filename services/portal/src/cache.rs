//! Auxiliary TTL cache for database catalog listings.
//!
//! Keys are content-derived (see [`crate::introspect::ConnectionDescriptor::fingerprint`])
//! so a changed descriptor never hits an older entry. Entries expire lazily on
//! read after a fixed TTL, and every write sweeps expired entries and caps the
//! map at `max_entries`, dropping whatever expires soonest. Nothing here takes part in authorization: handlers
//! run the role gate before consulting the cache.
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct ContextCache<V> {
    inner: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> ContextCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    /// A zero capacity is treated as one.
    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn put(&self, key: impl Into<String>, value: V) {
        let now = Instant::now();
        let mut guard = self.inner.write().await;
        guard.retain(|_, entry| entry.expires_at > now);
        guard.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
        while guard.len() > self.max_entries {
            let Some(oldest) = guard
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            guard.remove(&oldest);
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        // Write lock so an expired entry can be dropped on the spot.
        let mut guard = self.inner.write().await;
        let entry = guard.get(key)?;
        if Instant::now() >= entry.expires_at {
            guard.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.inner.write().await.remove(key).is_some()
    }

    /// Drop every entry whose key starts with `prefix`; returns how many went.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|key, _| !key.starts_with(prefix));
        before - guard.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
