use async_trait::async_trait;
use portal_core::{CacheError, ShortCode};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::cache::{CacheKeys, LinkCache, Result, CLICKS_TTL};

/// A Redis-based implementation of [`LinkCache`].
///
/// URLs are stored as plain strings under `{prefix}:url:{code}` with
/// `SET EX`; counters live under `{prefix}:clicks:{code}`.
#[derive(Debug, Clone)]
pub struct RedisLinkCache {
    conn: redis::aio::MultiplexedConnection,
    keys: CacheKeys,
}

pub(crate) fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisLinkCache {
    /// Creates a new Redis link cache with the default `portal` prefix.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            keys: CacheKeys::default(),
        }
    }

    /// Creates a new Redis link cache with a custom key prefix.
    pub fn with_prefix(conn: redis::aio::MultiplexedConnection, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            keys: CacheKeys::new(prefix),
        }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::with_prefix(conn, prefix))
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let key = self.keys.url(code);
        trace!(code = %code, "Fetching URL from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(url)) => {
                debug!(code = %code, "Cache hit in Redis");
                Ok(Some(url))
            }
            Ok(None) => {
                trace!(code = %code, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => Err(map_redis_error("failed to fetch value from Redis", e)),
        }
    }

    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Duration) -> Result<()> {
        let key = self.keys.url(code);
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            // PSETEX rejects a zero expiry; nothing may outlive it either
            return self.del(code).await;
        }
        trace!(code = %code, ttl_ms = millis, "Storing URL in Redis cache");

        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(&key, url, millis)
            .await
            .map_err(|e| map_redis_error("failed to write value to Redis", e))?;
        debug!(code = %code, "Cached URL in Redis");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.keys.url(code);
        trace!(code = %code, "Removing URL from Redis cache");

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| map_redis_error("failed to delete value from Redis", e))?;
        debug!(code = %code, "Removed URL from Redis cache");
        Ok(())
    }

    async fn incr_clicks(&self, code: &ShortCode) -> Result<u64> {
        let key = self.keys.clicks(code);

        let mut conn = self.conn.clone();
        let count: u64 = conn
            .incr(&key, 1_u64)
            .await
            .map_err(|e| map_redis_error("failed to increment counter in Redis", e))?;

        if count == 1 {
            // The counter was just created. A failure here leaves a counter
            // without expiry, which is logged but not fatal.
            if let Err(e) = conn
                .expire::<_, ()>(&key, CLICKS_TTL.as_secs() as i64)
                .await
            {
                warn!(code = %code, error = %e, "Failed to set click counter expiry");
            }
        }

        trace!(code = %code, count, "Incremented click counter in Redis");
        Ok(count)
    }
}
