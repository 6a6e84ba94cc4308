//! In-process TTL cache.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// String-keyed cache with a per-entry absolute expiry.
///
/// A read past expiry returns `None` and evicts the entry in the same
/// critical section.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if Instant::now() <= entry.expires_at => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        entries.remove(key);
        tracing::debug!(key, "cache entry expired");
        None
    }

    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().await.insert(key.into(), entry);
    }

    /// Drop one key, or everything when `key` is `None`.
    pub async fn invalidate(&self, key: Option<&str>) {
        let mut entries = self.entries.lock().await;
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    /// Keys currently stored, sorted. Entries past expiry are still listed
    /// until a read evicts them.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
