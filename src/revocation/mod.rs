//! Revocation store: token blacklist and admission counters.
//!
//! A key-value store with per-key expiry. Tokens are blacklisted for their
//! remaining validity, and the admission pipeline's sliding-window counters
//! and lockout records live here too, so no cross-request coordination happens
//! in-process.
//!
//! Every implementation is fail-open: transient store errors are logged and
//! degrade to "not blacklisted" / "counter absent" rather than raised. The
//! store is a cache, not the source of truth for token validity, and an infra
//! outage must not become a full outage.

use async_trait::async_trait;
use std::time::Duration;

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

const BLACKLIST_PREFIX: &str = "blacklist:";

/// Shared storage backing revocation and admission state.
///
/// Injected explicitly into the pipeline and middleware so tests can
/// substitute an in-memory fake.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Blacklist a token for `ttl_seconds`. Idempotent; a no-op when the TTL
    /// is zero or negative, since an already-expired token needs no entry.
    async fn blacklist(&self, token: &str, ttl_seconds: i64);

    /// Whether the token is blacklisted. Fails open to `false` when the store
    /// is unavailable.
    async fn is_blacklisted(&self, token: &str) -> bool;

    /// Atomically increment a counter, setting `window` as its TTL when the
    /// key is created. Returns the new count, or 0 ("counter absent") when
    /// the store is unavailable.
    async fn increment(&self, key: &str, window: Duration) -> i64;

    /// Read a counter value, `None` when absent or on store failure.
    async fn get(&self, key: &str) -> Option<i64>;

    /// Write a value with a TTL, overwriting any existing entry.
    async fn set(&self, key: &str, value: i64, ttl: Duration);

    /// Remove a key.
    async fn delete(&self, key: &str);

    /// Reset the TTL of an existing key.
    async fn expire(&self, key: &str, ttl: Duration);

    /// Liveness probe for `/health`.
    async fn ping(&self) -> bool;
}

pub(crate) fn blacklist_key(token: &str) -> String {
    format!("{BLACKLIST_PREFIX}{token}")
}
