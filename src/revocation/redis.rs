//! Redis-backed revocation store.
//!
//! Uses a `ConnectionManager` (auto-reconnecting multiplexed connection).
//! Counter increments go through a small Lua script so the initial TTL is set
//! atomically with the first increment; without it, two concurrent first
//! requests could race and leave a counter without expiry.
//!
//! Every call is wrapped in a bounded timeout and treated as a miss on
//! failure, per the fail-open policy.

use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use std::time::Duration;
use tracing::warn;

use super::{RevocationStore, blacklist_key};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(2);

const INCR_WITH_TTL: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

pub struct RedisStore {
    manager: ConnectionManager,
    call_timeout: Duration,
    incr_script: Script,
}

impl RedisStore {
    /// Connect to Redis and build the store.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the initial connection fails.
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }

    #[must_use]
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            incr_script: Script::new(INCR_WITH_TTL),
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Run a store call with the bounded timeout, degrading to `default` on
    /// error or timeout.
    async fn call<T, F>(&self, operation: &'static str, key: &str, default: T, fut: F) -> T
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                warn!(operation, key, error = %err, "revocation store call failed; failing open");
                default
            }
            Err(_) => {
                warn!(operation, key, "revocation store call timed out; failing open");
                default
            }
        }
    }
}

#[async_trait]
impl RevocationStore for RedisStore {
    async fn blacklist(&self, token: &str, ttl_seconds: i64) {
        if ttl_seconds <= 0 {
            return;
        }
        let key = blacklist_key(token);
        let mut conn = self.manager.clone();
        self.call("blacklist", &key, (), async {
            conn.set_ex(&key, 1i64, ttl_seconds.unsigned_abs()).await
        })
        .await;
    }

    async fn is_blacklisted(&self, token: &str) -> bool {
        let key = blacklist_key(token);
        let mut conn = self.manager.clone();
        self.call("is_blacklisted", &key, false, async {
            conn.exists(&key).await
        })
        .await
    }

    async fn increment(&self, key: &str, window: Duration) -> i64 {
        let mut conn = self.manager.clone();
        let mut invocation = self.incr_script.prepare_invoke();
        invocation.key(key).arg(window.as_secs());
        self.call("increment", key, 0, invocation.invoke_async(&mut conn))
            .await
    }

    async fn get(&self, key: &str) -> Option<i64> {
        let mut conn = self.manager.clone();
        self.call("get", key, None, async { conn.get(key).await })
            .await
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) {
        let mut conn = self.manager.clone();
        self.call("set", key, (), async {
            conn.set_ex(key, value, ttl.as_secs()).await
        })
        .await;
    }

    async fn delete(&self, key: &str) {
        let mut conn = self.manager.clone();
        self.call("delete", key, (), async { conn.del(key).await })
            .await;
    }

    async fn expire(&self, key: &str, ttl: Duration) {
        let mut conn = self.manager.clone();
        let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        self.call("expire", key, (), async {
            conn.expire(key, seconds).await
        })
        .await;
    }

    async fn ping(&self) -> bool {
        let mut conn = self.manager.clone();
        self.call("ping", "-", false, async {
            redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .map(|reply| reply == "PONG")
        })
        .await
    }
}
