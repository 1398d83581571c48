use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use portal_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::cache::{LinkCache, Result, CLICKS_TTL};

#[derive(Debug, Clone)]
struct CachedUrl {
    url: String,
    ttl: Duration,
}

/// Expires each URL entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedUrl> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedUrl, _now: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedUrl,
        _updated_at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-local [`LinkCache`].
///
/// Suited to single-node deployments and tests. URL entries expire
/// individually; click counters expire [`CLICKS_TTL`] after creation and are
/// not refreshed by later increments.
#[derive(Clone)]
pub struct MokaLinkCache {
    urls: Cache<String, CachedUrl>,
    clicks: Cache<String, Arc<AtomicU64>>,
}

impl std::fmt::Debug for MokaLinkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaLinkCache")
            .field("urls", &self.urls.entry_count())
            .field("clicks", &self.clicks.entry_count())
            .finish()
    }
}

impl MokaLinkCache {
    /// Holds up to 10,000 URLs.
    pub fn new() -> Self {
        CacheConfig::builder().build().into()
    }

    pub fn builder() -> CacheConfigBuilder {
        CacheConfig::builder()
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        trace!(code = %code, "moka lookup");

        match self.urls.get(code.as_str()).await {
            Some(entry) => {
                debug!(code = %code, "moka hit");
                Ok(Some(entry.url))
            }
            None => {
                trace!(code = %code, "moka miss");
                Ok(None)
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, url: &str, ttl: Duration) -> Result<()> {
        trace!(code = %code, ttl_ms = ttl.as_millis() as u64, "moka store");

        let entry = CachedUrl {
            url: url.to_string(),
            ttl,
        };
        self.urls.insert(code.as_str().to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "moka evict");
        self.urls.invalidate(code.as_str()).await;
        Ok(())
    }

    async fn incr_clicks(&self, code: &ShortCode) -> Result<u64> {
        let counter = self
            .clicks
            .get_with(code.as_str().to_string(), async {
                Arc::new(AtomicU64::new(0))
            })
            .await;
        Ok(counter.fetch_add(1, Ordering::AcqRel) + 1)
    }
}

/// Sizing of a [`MokaLinkCache`].
#[derive(Debug, TypedBuilder)]
pub struct CacheConfig {
    /// Maximum number of URL entries the cache can hold.
    #[builder(default = 10_000)]
    max_capacity: u64,
    /// Lifetime of click counters, measured from creation.
    #[builder(default = CLICKS_TTL)]
    clicks_ttl: Duration,
}

impl From<CacheConfig> for MokaLinkCache {
    fn from(config: CacheConfig) -> Self {
        let urls = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        let clicks = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.clicks_ttl)
            .build();

        MokaLinkCache { urls, clicks }
    }
}
