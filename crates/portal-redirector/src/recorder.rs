use crate::device::classify;
use jiff::Timestamp;
use portal_cache::ResolutionCache;
use portal_core::click::UNKNOWN_COUNTRY;
use portal_core::{ClickContext, ClickEvent, ClickRepository, LinkRepository, ShortCode};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves a client IP to a country name.
pub trait CountryLookup: Send + Sync + 'static {
    fn country(&self, ip: &str) -> String;
}

/// Lookup used when no geo database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCountryLookup;

impl CountryLookup for NoCountryLookup {
    fn country(&self, _ip: &str) -> String {
        UNKNOWN_COUNTRY.to_string()
    }
}

/// Which steps of one click recording went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOutcome {
    pub event_stored: bool,
    pub counter_incremented: bool,
    /// The cache counter after the increment, if the cache answered.
    pub cached_count: Option<u64>,
}

/// Persists the accounting for one completed resolution.
///
/// The three steps run in order and independently: a failed step is logged
/// and the next one still runs.
#[derive(Clone)]
pub struct ClickRecorder {
    links: Arc<dyn LinkRepository>,
    clicks: Arc<dyn ClickRepository>,
    cache: ResolutionCache,
    countries: Arc<dyn CountryLookup>,
}

impl ClickRecorder {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        clicks: Arc<dyn ClickRepository>,
        cache: ResolutionCache,
    ) -> Self {
        Self {
            links,
            clicks,
            cache,
            countries: Arc::new(NoCountryLookup),
        }
    }

    pub fn with_country_lookup(mut self, countries: Arc<dyn CountryLookup>) -> Self {
        self.countries = countries;
        self
    }

    pub fn event(&self, code: ShortCode, context: ClickContext) -> ClickEvent {
        let device = classify(&context.user_agent);
        let country = self.countries.country(&context.ip);
        ClickEvent {
            short_code: code,
            ip: context.ip,
            user_agent: context.user_agent,
            referer: context.referer,
            device,
            country,
            created_at: Timestamp::now(),
        }
    }

    pub async fn record(&self, code: ShortCode, context: ClickContext) -> ClickOutcome {
        let event = self.event(code.clone(), context);
        let device = event.device;

        let event_stored = match self.clicks.record(event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(code = %code, error = %e, kind = %e.kind(), "failed to store click event");
                false
            }
        };

        let counter_incremented = match self.links.increment_clicks(&code, 1).await {
            Ok(()) => true,
            Err(e) => {
                warn!(code = %code, error = %e, kind = %e.kind(), "failed to increment click count");
                false
            }
        };

        // failures are already logged by the cache wrapper
        let cached_count = self.cache.incr_clicks(&code).await;

        debug!(code = %code, %device, event_stored, counter_incremented, "click recorded");
        ClickOutcome {
            event_stored,
            counter_incremented,
            cached_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use portal_cache::{CacheSettings, MokaLinkCache};
    use portal_core::repository::Result;
    use portal_core::{ClickSummary, ClickWindow, DeviceClass, LinkRecord, StorageError};
    use portal_storage::InMemoryRepository;

    struct FailingClicks;

    #[async_trait]
    impl ClickRepository for FailingClicks {
        async fn record(&self, _event: ClickEvent) -> Result<()> {
            Err(StorageError::Unavailable("connection reset".into()))
        }

        async fn last_accessed(&self, _code: &ShortCode) -> Result<Option<Timestamp>> {
            Ok(None)
        }

        async fn summary(&self, code: &ShortCode, _window: ClickWindow) -> Result<ClickSummary> {
            Ok(ClickSummary::empty(code.clone()))
        }
    }

    struct FixedCountry;

    impl CountryLookup for FixedCountry {
        fn country(&self, _ip: &str) -> String {
            "NL".to_string()
        }
    }

    fn cache() -> ResolutionCache {
        ResolutionCache::new(Arc::new(MokaLinkCache::new()), CacheSettings::default())
    }

    async fn seeded() -> (Arc<InMemoryRepository>, ShortCode) {
        let store = Arc::new(InMemoryRepository::new());
        let code = ShortCode::new_unchecked("abc");
        store
            .create(LinkRecord::new(code.clone(), "https://example.com", Timestamp::now()))
            .await
            .unwrap();
        (store, code)
    }

    fn context() -> ClickContext {
        ClickContext {
            ip: "198.51.100.7".into(),
            user_agent: "curl/8.4.0".into(),
            referer: "https://news.example".into(),
        }
    }

    #[tokio::test]
    async fn records_all_three_steps() {
        let (store, code) = seeded().await;
        let recorder = ClickRecorder::new(store.clone(), store.clone(), cache());

        let outcome = recorder.record(code.clone(), context()).await;
        assert_eq!(
            outcome,
            ClickOutcome {
                event_stored: true,
                counter_incremented: true,
                cached_count: Some(1),
            }
        );

        assert_eq!(store.find_by_code(&code).await.unwrap().click_count, 1);
        let summary = store.summary(&code, ClickWindow::all()).await.unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.devices.get("curl"), Some(&1));
        assert_eq!(summary.referers.get("https://news.example"), Some(&1));
    }

    #[tokio::test]
    async fn click_count_does_not_bump_version() {
        let (store, code) = seeded().await;
        let recorder = ClickRecorder::new(store.clone(), store.clone(), cache());

        recorder.record(code.clone(), context()).await;
        recorder.record(code.clone(), context()).await;

        let record = store.find_by_code(&code).await.unwrap();
        assert_eq!(record.click_count, 2);
        assert_eq!(record.version, 1);
    }

    #[tokio::test]
    async fn failed_event_write_does_not_stop_counters() {
        let (store, code) = seeded().await;
        let recorder = ClickRecorder::new(store.clone(), Arc::new(FailingClicks), cache());

        let outcome = recorder.record(code.clone(), context()).await;
        assert!(!outcome.event_stored);
        assert!(outcome.counter_incremented);
        assert_eq!(outcome.cached_count, Some(1));
    }

    #[tokio::test]
    async fn unknown_code_still_counts_in_cache() {
        let store = Arc::new(InMemoryRepository::new());
        let recorder = ClickRecorder::new(store.clone(), store.clone(), cache());

        let outcome = recorder
            .record(ShortCode::new_unchecked("ghost"), context())
            .await;
        assert!(outcome.event_stored);
        assert!(!outcome.counter_incremented);
        assert_eq!(outcome.cached_count, Some(1));
    }

    #[test]
    fn event_derives_device_and_country() {
        let store = Arc::new(InMemoryRepository::new());
        let recorder = ClickRecorder::new(store.clone(), store, cache())
            .with_country_lookup(Arc::new(FixedCountry));

        let event = recorder.event(
            ShortCode::new_unchecked("abc"),
            ClickContext {
                user_agent: "Mozilla/5.0 (iPhone) Mobile".into(),
                ..Default::default()
            },
        );
        assert_eq!(event.device, DeviceClass::Mobile);
        assert_eq!(event.country, "NL");
        assert_eq!(event.referer, "");
    }

    #[test]
    fn default_country_is_unknown() {
        assert_eq!(NoCountryLookup.country("203.0.113.1"), UNKNOWN_COUNTRY);
    }
}
