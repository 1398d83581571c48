use crate::code::CodeGenerator;
use crate::destination::UrlPolicy;
use crate::ShortenerError;
use jiff::{SignedDuration, Timestamp};
use portal_cache::ResolutionCache;
use portal_core::link::ANONYMOUS;
use portal_core::{
    ClickRepository, ClickSummary, ClickWindow, DailyClicks, LinkChanges, LinkPage, LinkRecord,
    LinkRepository, LinkStatus, ListFilter, PageRequest, ShortCode, StorageError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Upper bound on links created by one batch call.
pub const MAX_BATCH_SIZE: usize = 100;
/// Days covered by a daily breakdown when the caller does not say.
pub const DEFAULT_DAILY_DAYS: u32 = 30;
pub const MAX_DAILY_DAYS: u32 = 365;

/// Input for creating one link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateLink {
    pub long_url: String,
    pub custom_code: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub created_by: Option<String>,
    pub description: Option<String>,
}

/// A partial update. Fields left `None` are untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateLink {
    pub long_url: Option<String>,
    /// `Some(None)` clears the expiry.
    pub expires_at: Option<Option<Timestamp>>,
    /// Only `active` and `disabled` can be set by callers.
    pub status: Option<LinkStatus>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    /// Version the caller last saw. Defaults to the version read just before
    /// the update.
    pub expected_version: Option<u64>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkInfo {
    pub record: LinkRecord,
    pub last_accessed: Option<Timestamp>,
}

#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// Position of the item in the request.
    pub index: usize,
    pub error: ShortenerError,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub created: Vec<LinkRecord>,
    pub failed: Vec<BatchFailure>,
}

/// Management side of the short-link service.
///
/// The durable store is authoritative for every operation here. The cache is
/// written through on create and refreshed or invalidated after each
/// mutation, always best-effort.
#[derive(Clone)]
pub struct LinkService {
    links: Arc<dyn LinkRepository>,
    clicks: Arc<dyn ClickRepository>,
    codes: CodeGenerator,
    cache: ResolutionCache,
    urls: UrlPolicy,
}

impl LinkService {
    pub fn new(
        links: Arc<dyn LinkRepository>,
        clicks: Arc<dyn ClickRepository>,
        codes: CodeGenerator,
        cache: ResolutionCache,
        urls: UrlPolicy,
    ) -> Self {
        Self {
            links,
            clicks,
            codes,
            cache,
            urls,
        }
    }

    pub async fn create(&self, request: CreateLink) -> Result<LinkRecord, ShortenerError> {
        let now = Timestamp::now();
        let long_url = self.urls.normalize(&request.long_url)?;
        if let Some(expires_at) = request.expires_at {
            ensure_future(expires_at, now)?;
        }

        let code = match request.custom_code.as_deref() {
            Some(custom) => self.codes.custom(custom).await?,
            None => self.codes.generate().await?,
        };

        let creator = actor(request.created_by);
        let mut record = LinkRecord::new(code, long_url, now);
        record.expires_at = request.expires_at;
        record.description = non_empty(request.description);
        record.created_by = creator.clone();
        record.updated_by = creator;

        // A racing creator that slipped past the existence check loses here.
        let created = self.links.create(record).await?;
        info!(code = %created.short_code, created_by = %created.created_by, "link created");

        // Avoids a guaranteed miss on the first resolution.
        if !self.cache.store(&created).await {
            debug!(code = %created.short_code, "link not written through to cache");
        }

        Ok(created)
    }

    /// Creates each item independently; one failure does not stop the rest.
    pub async fn batch_create(
        &self,
        requests: Vec<CreateLink>,
    ) -> Result<BatchOutcome, ShortenerError> {
        if requests.is_empty() {
            return Err(ShortenerError::InvalidRequest(
                "batch must contain at least one link".to_string(),
            ));
        }
        if requests.len() > MAX_BATCH_SIZE {
            return Err(ShortenerError::InvalidRequest(format!(
                "batch holds {} links, the limit is {}",
                requests.len(),
                MAX_BATCH_SIZE
            )));
        }

        let mut outcome = BatchOutcome::default();
        for (index, request) in requests.into_iter().enumerate() {
            match self.create(request).await {
                Ok(record) => outcome.created.push(record),
                Err(error) => {
                    debug!(index, error = %error, "batch item rejected");
                    outcome.failed.push(BatchFailure { index, error });
                }
            }
        }
        info!(
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "batch create finished"
        );
        Ok(outcome)
    }

    pub async fn info(&self, code: &ShortCode) -> Result<LinkInfo, ShortenerError> {
        let record = self.links.find_by_code(code).await?;
        let last_accessed = self.clicks.last_accessed(code).await?;
        Ok(LinkInfo {
            record,
            last_accessed,
        })
    }

    pub async fn update(
        &self,
        code: &ShortCode,
        request: UpdateLink,
    ) -> Result<LinkRecord, ShortenerError> {
        let now = Timestamp::now();

        if request.status == Some(LinkStatus::Expired) {
            return Err(ShortenerError::InvalidRequest(
                "status can only be set to active or disabled".to_string(),
            ));
        }
        if let Some(Some(expires_at)) = request.expires_at {
            ensure_future(expires_at, now)?;
        }
        let long_url = request
            .long_url
            .as_deref()
            .map(|url| self.urls.normalize(url))
            .transpose()?;

        let changes = LinkChanges {
            long_url,
            status: request.status,
            expires_at: request.expires_at,
            description: request.description.map(non_empty),
            deleted: None,
            updated_by: Some(actor(request.updated_by)),
        };
        if changes.is_empty() {
            return Err(ShortenerError::InvalidRequest(
                "update changes nothing".to_string(),
            ));
        }

        let updated = self
            .commit(code, request.expected_version, &changes)
            .await?;
        info!(code = %code, version = updated.version, status = %updated.status, "link updated");

        self.refresh_cache(&updated, now).await;
        Ok(updated)
    }

    pub async fn disable(
        &self,
        code: &ShortCode,
        expected_version: Option<u64>,
        updated_by: Option<String>,
    ) -> Result<LinkRecord, ShortenerError> {
        self.update(
            code,
            UpdateLink {
                status: Some(LinkStatus::Disabled),
                expected_version,
                updated_by,
                ..Default::default()
            },
        )
        .await
    }

    /// Soft delete. The row and its code stay reserved.
    pub async fn delete(
        &self,
        code: &ShortCode,
        expected_version: Option<u64>,
        updated_by: Option<String>,
    ) -> Result<(), ShortenerError> {
        let changes = LinkChanges {
            deleted: Some(true),
            updated_by: Some(actor(updated_by)),
            ..Default::default()
        };
        let deleted = self.commit(code, expected_version, &changes).await?;
        info!(code = %code, version = deleted.version, "link deleted");

        if !self.cache.delete(code).await {
            warn!(code = %code, "deleted link may stay resolvable until its cache entry expires");
        }
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &ListFilter,
        page: PageRequest,
    ) -> Result<LinkPage, ShortenerError> {
        Ok(self.links.list(filter, page).await?)
    }

    pub async fn stats(
        &self,
        code: &ShortCode,
        window: ClickWindow,
    ) -> Result<ClickSummary, ShortenerError> {
        if window.is_empty() {
            return Err(ShortenerError::InvalidRequest(
                "stats window must end after it starts".into(),
            ));
        }
        // unknown codes are reported as such rather than as an empty summary
        self.links.find_by_code(code).await?;
        Ok(self.clicks.summary(code, window).await?)
    }

    /// Clicks per UTC day over the last `days` days, newest first.
    pub async fn daily(
        &self,
        code: &ShortCode,
        days: u32,
    ) -> Result<Vec<DailyClicks>, ShortenerError> {
        if !(1..=MAX_DAILY_DAYS).contains(&days) {
            return Err(ShortenerError::InvalidRequest(format!(
                "days must be between 1 and {MAX_DAILY_DAYS}"
            )));
        }
        self.links.find_by_code(code).await?;
        let since = Timestamp::now() - SignedDuration::from_hours(24 * i64::from(days));
        Ok(self.clicks.daily(code, since).await?)
    }

    /// Marks due links as expired and drops their cache entries.
    pub async fn sweep_expired(&self) -> Result<Vec<ShortCode>, ShortenerError> {
        let expired = self.links.expire_due(Timestamp::now()).await?;
        for code in &expired {
            self.cache.delete(code).await;
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expired links swept");
        }
        Ok(expired)
    }

    /// Applies `changes` under optimistic concurrency.
    ///
    /// The store reports a version mismatch as not-found, so a failed write
    /// is followed by a re-read to tell the two apart.
    async fn commit(
        &self,
        code: &ShortCode,
        expected_version: Option<u64>,
        changes: &LinkChanges,
    ) -> Result<LinkRecord, ShortenerError> {
        let current = self.links.find_by_code(code).await?;
        let expected = expected_version.unwrap_or(current.version);
        if expected != current.version {
            return Err(version_conflict(code, expected, current.version));
        }

        match self.links.update_with_version(code, expected, changes).await {
            Ok(updated) => Ok(updated),
            Err(StorageError::NotFound(_)) => match self.links.find_by_code(code).await {
                Ok(latest) => Err(version_conflict(code, expected, latest.version)),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh_cache(&self, record: &LinkRecord, now: Timestamp) {
        let refreshed = if record.is_active(now) {
            self.cache.store(record).await
        } else {
            self.cache.delete(&record.short_code).await
        };
        if !refreshed {
            warn!(code = %record.short_code, "cache entry may be stale until it expires");
        }
    }
}

fn version_conflict(code: &ShortCode, expected: u64, actual: u64) -> ShortenerError {
    ShortenerError::VersionConflict {
        code: code.to_string(),
        expected,
        actual,
    }
}

fn ensure_future(expires_at: Timestamp, now: Timestamp) -> Result<(), ShortenerError> {
    if expires_at <= now {
        return Err(ShortenerError::InvalidRequest(format!(
            "expiry {expires_at} is not in the future"
        )));
    }
    Ok(())
}

fn actor(name: Option<String>) -> String {
    non_empty(name).unwrap_or_else(|| ANONYMOUS.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
