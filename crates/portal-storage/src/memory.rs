use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use portal_core::repository::{ClickRepository, LinkRepository, Result};
use portal_core::{
    ClickEvent, ClickSummary, ClickWindow, DailyClicks, DailyTally, LinkChanges, LinkPage, LinkRecord, LinkStatus, ListFilter,
    PageRequest, ShortCode, StorageError,
};

/// In-memory implementation of the store contracts using DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking. Conditional writes run under the shard lock of
/// their key, so a version check and its update are atomic.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    links: DashMap<String, LinkRecord>,
    clicks: DashMap<String, Vec<ClickEvent>>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: DashMap::with_capacity(capacity),
            clicks: DashMap::new(),
        }
    }
}

fn not_found(code: &ShortCode) -> StorageError {
    StorageError::NotFound(code.to_string())
}

#[async_trait]
impl LinkRepository for InMemoryRepository {
    async fn create(&self, record: LinkRecord) -> Result<LinkRecord> {
        // Soft-deleted entries stay in the map, so codes are never reused.
        match self.links.entry(record.short_code.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.short_code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<LinkRecord> {
        match self.links.get(code.as_str()) {
            Some(entry) if !entry.deleted => Ok(entry.clone()),
            _ => Err(not_found(code)),
        }
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.links.contains_key(code.as_str()))
    }

    async fn update_with_version(
        &self,
        code: &ShortCode,
        expected_version: u64,
        changes: &LinkChanges,
    ) -> Result<LinkRecord> {
        let Some(mut entry) = self.links.get_mut(code.as_str()) else {
            return Err(not_found(code));
        };
        if entry.deleted || entry.version != expected_version {
            return Err(not_found(code));
        }

        changes.apply(&mut entry, Timestamp::now());
        Ok(entry.clone())
    }

    async fn increment_clicks(&self, code: &ShortCode, delta: u64) -> Result<()> {
        match self.links.get_mut(code.as_str()) {
            Some(mut entry) if !entry.deleted => {
                entry.click_count += delta;
                Ok(())
            }
            _ => Err(not_found(code)),
        }
    }

    async fn list(&self, filter: &ListFilter, page: PageRequest) -> Result<LinkPage> {
        let mut matched: Vec<LinkRecord> = self
            .links
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.short_code.cmp(&b.short_code))
        });

        let total = matched.len() as u64;
        let records = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();

        Ok(LinkPage { records, total })
    }

    async fn expire_due(&self, now: Timestamp) -> Result<Vec<ShortCode>> {
        let mut expired = Vec::new();
        for mut entry in self.links.iter_mut() {
            let record = entry.value_mut();
            if !record.deleted && record.status == LinkStatus::Active && record.is_expired_at(now)
            {
                record.status = LinkStatus::Expired;
                record.updated_at = now;
                record.version += 1;
                expired.push(record.short_code.clone());
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl ClickRepository for InMemoryRepository {
    async fn record(&self, event: ClickEvent) -> Result<()> {
        self.clicks
            .entry(event.short_code.as_str().to_owned())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn last_accessed(&self, code: &ShortCode) -> Result<Option<Timestamp>> {
        Ok(self
            .clicks
            .get(code.as_str())
            .and_then(|events| events.iter().map(|e| e.created_at).max()))
    }

    async fn summary(&self, code: &ShortCode, window: ClickWindow) -> Result<ClickSummary> {
        let Some(events) = self.clicks.get(code.as_str()) else {
            return Ok(ClickSummary::empty(code.clone()));
        };
        Ok(ClickSummary::collect(
            code.clone(),
            events.iter().filter(|e| window.contains(e.created_at)),
        ))
    }

    async fn daily(&self, code: &ShortCode, since: Timestamp) -> Result<Vec<DailyClicks>> {
        let mut tally = DailyTally::default();
        if let Some(events) = self.clicks.get(code.as_str()) {
            events
                .iter()
                .filter(|e| e.created_at >= since)
                .for_each(|e| tally.add(e));
        }
        Ok(tally.into_days())
    }
}
