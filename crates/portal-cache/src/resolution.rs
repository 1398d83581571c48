use crate::cache::LinkCache;
use jiff::Timestamp;
use portal_core::{LinkRecord, ShortCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct CacheSettings {
    /// TTL written for records without an expiry.
    #[builder(default = Duration::from_secs(60 * 60))]
    pub url_ttl: Duration,
    /// Upper bound on any single cache call.
    #[builder(default = Duration::from_millis(250))]
    pub op_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Best-effort front for a [`LinkCache`].
///
/// No method returns an error. Failures and timeouts are logged and reported
/// as a miss (`None`), so callers fall back to the durable store.
#[derive(Clone)]
pub struct ResolutionCache {
    backend: Arc<dyn LinkCache>,
    settings: CacheSettings,
}

impl ResolutionCache {
    pub fn new(backend: Arc<dyn LinkCache>, settings: CacheSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    async fn guarded<T, F>(&self, op: &'static str, code: &ShortCode, fut: F) -> Option<T>
    where
        F: Future<Output = crate::Result<T>>,
    {
        match tokio::time::timeout(self.settings.op_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(code = %code, op, error = %e, kind = %e.kind(), "cache operation failed, degrading to store");
                None
            }
            Err(_) => {
                warn!(
                    code = %code,
                    op,
                    timeout_ms = self.settings.op_timeout.as_millis() as u64,
                    "cache operation timed out, degrading to store"
                );
                None
            }
        }
    }

    pub async fn get(&self, code: &ShortCode) -> Option<String> {
        self.guarded("get", code, self.backend.get_url(code))
            .await
            .flatten()
    }

    pub async fn set(&self, code: &ShortCode, url: &str, ttl: Duration) -> bool {
        self.guarded("set", code, self.backend.set_url(code, url, ttl))
            .await
            .is_some()
    }

    /// The TTL a record should be cached with: the default, capped at the
    /// time left until the record expires. `None` means the record must not
    /// be cached at all.
    pub fn ttl_for(&self, record: &LinkRecord, now: Timestamp) -> Option<Duration> {
        match record.remaining_lifetime(now) {
            None => Some(self.settings.url_ttl),
            Some(remaining) if remaining.is_zero() => None,
            Some(remaining) => Some(remaining.min(self.settings.url_ttl)),
        }
    }

    /// Writes a record's URL with its capped TTL. Expired records are skipped.
    pub async fn store(&self, record: &LinkRecord) -> bool {
        match self.ttl_for(record, Timestamp::now()) {
            Some(ttl) => self.set(&record.short_code, &record.long_url, ttl).await,
            None => false,
        }
    }

    pub async fn delete(&self, code: &ShortCode) -> bool {
        self.guarded("delete", code, self.backend.del(code))
            .await
            .is_some()
    }

    pub async fn incr_clicks(&self, code: &ShortCode) -> Option<u64> {
        self.guarded("incr_clicks", code, self.backend.incr_clicks(code))
            .await
    }
}
