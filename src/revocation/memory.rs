//! In-memory revocation store.
//!
//! Substitutes for Redis in tests and single-process deployments. Expiry is
//! driven by a monotonic clock that tests can advance explicitly, so TTL
//! behavior is observable without sleeping.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{RevocationStore, blacklist_key};

struct Entry {
    value: i64,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    // Virtual clock offset; only ever grows.
    skew: Mutex<Duration>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the store's clock, expiring entries whose TTL has elapsed.
    pub fn advance(&self, by: Duration) {
        let mut skew = self.skew.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *skew += by;
    }

    fn now(&self) -> Instant {
        let skew = *self
            .skew
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Instant::now() + skew
    }

    fn read(&self, key: &str) -> Option<i64> {
        let now = self.now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.expires_at.is_none_or(|at| at > now) => Some(entry.value),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn write(&self, key: &str, value: i64, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| self.now() + ttl);
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), Entry { value, expires_at });
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn blacklist(&self, token: &str, ttl_seconds: i64) {
        if ttl_seconds <= 0 {
            return;
        }
        self.write(
            &blacklist_key(token),
            1,
            Some(Duration::from_secs(ttl_seconds.unsigned_abs())),
        );
    }

    async fn is_blacklisted(&self, token: &str) -> bool {
        self.read(&blacklist_key(token)).is_some()
    }

    async fn increment(&self, key: &str, window: Duration) -> i64 {
        let now = self.now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at.is_none_or(|at| at > now) => {
                entry.value += 1;
                entry.value
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: 1,
                        expires_at: Some(now + window),
                    },
                );
                1
            }
        }
    }

    async fn get(&self, key: &str) -> Option<i64> {
        self.read(key)
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) {
        self.write(key, value, Some(ttl));
    }

    async fn delete(&self, key: &str) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(key);
    }

    async fn expire(&self, key: &str, ttl: Duration) {
        let expires_at = Some(self.now() + ttl);
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = expires_at;
        }
    }

    async fn ping(&self) -> bool {
        true
    }
}
