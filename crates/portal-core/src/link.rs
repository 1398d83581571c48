use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Audit name used when a caller does not identify itself.
pub const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Active,
    Disabled,
    Expired,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Active => "active",
            LinkStatus::Disabled => "disabled",
            LinkStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LinkStatus::Active),
            "disabled" => Ok(LinkStatus::Disabled),
            "expired" => Ok(LinkStatus::Expired),
            other => Err(format!("unknown link status '{other}'")),
        }
    }
}

/// A short link as owned by the durable store.
///
/// Records are never hard-deleted; `deleted` is a soft-delete flag and the
/// code stays reserved forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub short_code: ShortCode,
    pub long_url: String,
    pub status: LinkStatus,
    pub expires_at: Option<Timestamp>,
    pub click_count: u64,
    pub created_by: String,
    pub updated_by: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Bumped on every committed mutation except click accounting.
    pub version: u64,
    pub deleted: bool,
}

impl LinkRecord {
    /// A fresh active record at version 1.
    pub fn new(short_code: ShortCode, long_url: impl Into<String>, now: Timestamp) -> Self {
        Self {
            short_code,
            long_url: long_url.into(),
            status: LinkStatus::Active,
            expires_at: None,
            click_count: 0,
            created_by: ANONYMOUS.to_string(),
            updated_by: ANONYMOUS.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
            version: 1,
            deleted: false,
        }
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// The status every read path should act on: an active record whose
    /// expiry has passed counts as expired even before the sweeper runs.
    pub fn effective_status(&self, now: Timestamp) -> LinkStatus {
        match self.status {
            LinkStatus::Active if self.is_expired_at(now) => LinkStatus::Expired,
            status => status,
        }
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        self.effective_status(now) == LinkStatus::Active
    }

    /// Time left until `expires_at`, or `None` if the record never expires.
    /// Already expired records report a zero duration.
    pub fn remaining_lifetime(&self, now: Timestamp) -> Option<Duration> {
        self.expires_at
            .map(|at| Duration::try_from(at.duration_since(now)).unwrap_or(Duration::ZERO))
    }
}

/// A partial update applied under optimistic concurrency.
///
/// `None` leaves a field untouched. The nested options on `expires_at` and
/// `description` distinguish "leave as is" from "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkChanges {
    pub long_url: Option<String>,
    pub status: Option<LinkStatus>,
    pub expires_at: Option<Option<Timestamp>>,
    pub description: Option<Option<String>>,
    pub deleted: Option<bool>,
    pub updated_by: Option<String>,
}

impl LinkChanges {
    pub fn is_empty(&self) -> bool {
        self.long_url.is_none()
            && self.status.is_none()
            && self.expires_at.is_none()
            && self.description.is_none()
            && self.deleted.is_none()
    }

    /// Applies the changes in memory and bumps the version.
    pub fn apply(&self, record: &mut LinkRecord, now: Timestamp) {
        if let Some(url) = &self.long_url {
            record.long_url = url.clone();
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(expires_at) = self.expires_at {
            record.expires_at = expires_at;
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
        if let Some(deleted) = self.deleted {
            record.deleted = deleted;
        }
        if let Some(updated_by) = &self.updated_by {
            record.updated_by = updated_by.clone();
        }
        record.updated_at = now;
        record.version += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub created_by: Option<String>,
    pub status: Option<LinkStatus>,
    /// Substring matched against the short code and the destination URL.
    pub search: Option<String>,
}

impl ListFilter {
    /// Soft-deleted records never match.
    pub fn matches(&self, record: &LinkRecord) -> bool {
        if record.deleted {
            return false;
        }
        if let Some(created_by) = &self.created_by {
            if &record.created_by != created_by {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !record.short_code.as_str().contains(search.as_str())
                && !record.long_url.contains(search.as_str())
            {
                return false;
            }
        }
        true
    }
}

pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Clamps the page to at least 1 and the size to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkPage {
    pub records: Vec<LinkRecord>,
    pub total: u64,
}

impl LinkPage {
    pub fn page_count(&self, page_size: u32) -> u64 {
        self.total.div_ceil(u64::from(page_size.max(1)))
    }
}
