use async_trait::async_trait;
use portal_core::{SequenceError, SequenceSource};
use redis::AsyncCommands;

/// Default counter key shared by every node of a deployment.
pub const DEFAULT_SEQUENCE_KEY: &str = "portal:id_counter";

/// A [`SequenceSource`] backed by Redis `INCR`.
///
/// Values are unique and increasing as observed by the Redis server; no
/// local clock is involved.
#[derive(Debug, Clone)]
pub struct RedisSequence {
    conn: redis::aio::MultiplexedConnection,
    key: String,
}

impl RedisSequence {
    pub fn new(conn: redis::aio::MultiplexedConnection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl SequenceSource for RedisSequence {
    async fn next_value(&self) -> Result<u64, SequenceError> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, u64>(&self.key, 1_u64)
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SequenceError::Timeout(e.to_string())
                } else {
                    SequenceError::Unavailable(e.to_string())
                }
            })
    }
}
