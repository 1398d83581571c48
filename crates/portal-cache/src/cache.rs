use async_trait::async_trait;
use portal_core::{CacheError, ShortCode};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Lifetime of a click counter, applied only when the counter is created.
pub const CLICKS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Builds the `{prefix}:{kind}:{code}` keys shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
}

impl CacheKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn url(&self, code: &ShortCode) -> String {
        format!("{}:url:{}", self.prefix, code)
    }

    pub fn clicks(&self, code: &ShortCode) -> String {
        format!("{}:clicks:{}", self.prefix, code)
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self::new("portal")
    }
}

/// A volatile key/value store for code → URL mappings and click counters.
///
/// Entries may vanish at any time. A miss is never an authoritative "not
/// found".
#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Get the destination URL for a code.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Store the destination URL for a code with a time-to-live.
    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Duration) -> Result<()>;

    /// Remove the URL entry for a code.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Increment the click counter and return the new count.
    ///
    /// [`CLICKS_TTL`] is applied only when this call creates the counter.
    async fn incr_clicks(&self, code: &ShortCode) -> Result<u64>;
}
