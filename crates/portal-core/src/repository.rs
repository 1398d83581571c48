use crate::click::{ClickEvent, ClickSummary, ClickWindow, DailyClicks};
use crate::error::StorageError;
use crate::link::{LinkChanges, LinkPage, LinkRecord, ListFilter, PageRequest};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The authoritative store of link records.
///
/// The store's uniqueness constraint on the short code is the final arbiter
/// of conflicts: concurrent creators racing on one code are settled by
/// [`LinkRepository::create`], not by any earlier existence check.
#[async_trait]
pub trait LinkRepository: Send + Sync + 'static {
    /// Inserts a new record. Returns `Err(Conflict)` if the code is taken,
    /// including by a soft-deleted record.
    async fn create(&self, record: LinkRecord) -> Result<LinkRecord>;

    /// Returns the live record for a code, `Err(NotFound)` if it is missing
    /// or soft-deleted.
    async fn find_by_code(&self, code: &ShortCode) -> Result<LinkRecord>;

    /// Checks whether a code was ever taken. Soft-deleted records count.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Applies `changes` only if the stored version equals
    /// `expected_version`, bumping the version on success.
    ///
    /// Returns `Err(NotFound)` when the code is missing, soft-deleted, or
    /// the version does not match.
    async fn update_with_version(
        &self,
        code: &ShortCode,
        expected_version: u64,
        changes: &LinkChanges,
    ) -> Result<LinkRecord>;

    /// Adds `delta` to the durable click counter without touching the version.
    async fn increment_clicks(&self, code: &ShortCode, delta: u64) -> Result<()>;

    /// Returns one page of live records, newest first, and the total match count.
    async fn list(&self, filter: &ListFilter, page: PageRequest) -> Result<LinkPage>;

    /// Marks every active record whose expiry is at or before `now` as
    /// expired and returns their codes.
    async fn expire_due(&self, now: Timestamp) -> Result<Vec<ShortCode>>;
}

/// Append-only store of click events.
#[async_trait]
pub trait ClickRepository: Send + Sync + 'static {
    async fn record(&self, event: ClickEvent) -> Result<()>;

    /// Timestamp of the newest event for a code.
    async fn last_accessed(&self, code: &ShortCode) -> Result<Option<Timestamp>>;

    /// Aggregates the events of a code that fall inside `window`.
    async fn summary(&self, code: &ShortCode, window: ClickWindow) -> Result<ClickSummary>;

    /// Per-day counts of events at or after `since`, newest day first.
    async fn daily(&self, code: &ShortCode, since: Timestamp) -> Result<Vec<DailyClicks>> {
        Ok(self.summary(code, ClickWindow::since(since)).await?.daily)
    }
}
