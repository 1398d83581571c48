use crate::recorder::ClickRecorder;
use crate::redirector::{Redirector, ResolveSource, Resolved};
use crate::{RedirectError, Result};
use async_trait::async_trait;
use jiff::Timestamp;
use portal_cache::ResolutionCache;
use portal_core::{ClickContext, Dispatcher, LinkRecord, LinkRepository, LinkStatus, ShortCode};
use std::sync::Arc;
use tracing::{debug, trace};

/// The hot path: cache first, then the durable store.
///
/// A cache hit is served without looking at the store, so a link disabled
/// or expired after it was cached keeps resolving until its entry is
/// invalidated or its TTL runs out. Mutations invalidate eagerly and cache
/// TTLs never outlive a record's expiry, which keeps that window small.
///
/// Cache refills and click accounting go to the [`Dispatcher`] and never
/// delay or fail the response.
#[derive(Clone)]
pub struct ResolutionService {
    links: Arc<dyn LinkRepository>,
    cache: ResolutionCache,
    recorder: ClickRecorder,
    dispatcher: Dispatcher,
}

impl ResolutionService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        cache: ResolutionCache,
        recorder: ClickRecorder,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            links,
            cache,
            recorder,
            dispatcher,
        }
    }

    pub async fn resolve(&self, code: &ShortCode, context: ClickContext) -> Result<Resolved> {
        Redirector::resolve(self, code, context).await
    }

    fn check_status(record: &LinkRecord, now: Timestamp) -> Result<()> {
        match record.effective_status(now) {
            LinkStatus::Active => Ok(()),
            LinkStatus::Expired => Err(RedirectError::Expired(record.short_code.to_string())),
            LinkStatus::Disabled => Err(RedirectError::Disabled(record.short_code.to_string())),
        }
    }

    fn dispatch_refill(&self, record: LinkRecord) {
        let cache = self.cache.clone();
        self.dispatcher.spawn("cache_refill", async move {
            if cache.store(&record).await {
                trace!(code = %record.short_code, "cache refilled");
            }
        });
    }

    fn dispatch_click(&self, code: &ShortCode, context: ClickContext) {
        let recorder = self.recorder.clone();
        let code = code.clone();
        self.dispatcher.spawn("click_record", async move {
            recorder.record(code, context).await;
        });
    }
}

#[async_trait]
impl Redirector for ResolutionService {
    async fn resolve(&self, code: &ShortCode, context: ClickContext) -> Result<Resolved> {
        trace!(code = %code, "resolving short code");

        if let Some(url) = self.cache.get(code).await {
            debug!(code = %code, "resolved from cache");
            self.dispatch_click(code, context);
            return Ok(Resolved {
                url,
                source: ResolveSource::Cache,
            });
        }

        let record = self.links.find_by_code(code).await?;
        if let Err(e) = Self::check_status(&record, Timestamp::now()) {
            debug!(code = %code, reason = %e, "refusing to resolve");
            return Err(e);
        }

        debug!(code = %code, "resolved from store");
        let url = record.long_url.clone();
        self.dispatch_refill(record);
        self.dispatch_click(code, context);
        Ok(Resolved {
            url,
            source: ResolveSource::Store,
        })
    }
}
