use crate::error::ErrorInfo;
use jiff::Timestamp;
use portal_core::{ClickWindow, LinkRecord, LinkStatus};
use portal_shortener::{CreateLink, UpdateLink};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    pub custom_code: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub created_by: Option<String>,
    pub description: Option<String>,
}

impl From<CreateLinkRequest> for CreateLink {
    fn from(request: CreateLinkRequest) -> Self {
        CreateLink {
            long_url: request.url,
            custom_code: request.custom_code,
            expires_at: request.expires_at,
            created_by: request.created_by,
            description: request.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub links: Vec<CreateLinkRequest>,
}

/// Distinguishes an absent field from an explicit `null`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLinkRequest {
    pub url: Option<String>,
    /// `null` clears the expiry.
    #[serde(default, deserialize_with = "nullable")]
    pub expires_at: Option<Option<Timestamp>>,
    pub status: Option<LinkStatus>,
    /// `null` clears the description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub version: Option<u64>,
    pub updated_by: Option<String>,
}

impl From<UpdateLinkRequest> for UpdateLink {
    fn from(request: UpdateLinkRequest) -> Self {
        UpdateLink {
            long_url: request.url,
            expires_at: request.expires_at,
            status: request.status,
            description: request.description,
            expected_version: request.version,
            updated_by: request.updated_by,
        }
    }
}

/// Query parameters of disable and delete.
#[derive(Debug, Default, Deserialize)]
pub struct MutationQuery {
    pub version: Option<u64>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub created_by: Option<String>,
    pub status: Option<LinkStatus>,
    pub search: Option<String>,
}

/// Half-open `[since, until)` filter on click time.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
}

impl From<StatsQuery> for ClickWindow {
    fn from(query: StatsQuery) -> Self {
        ClickWindow {
            since: query.since,
            until: query.until,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub short_code: String,
    pub short_url: String,
    pub long_url: String,
    /// Effective status: an active link past its expiry reads as expired.
    pub status: LinkStatus,
    pub expires_at: Option<Timestamp>,
    pub click_count: u64,
    pub description: Option<String>,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<Timestamp>,
}

impl LinkResponse {
    pub fn new(record: LinkRecord, base_url: &str) -> Self {
        let status = record.effective_status(Timestamp::now());
        Self {
            short_url: record.short_code.to_url(base_url),
            short_code: record.short_code.into(),
            long_url: record.long_url,
            status,
            expires_at: record.expires_at,
            click_count: record.click_count,
            description: record.description,
            created_by: record.created_by,
            updated_by: record.updated_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
            version: record.version,
            last_accessed: None,
        }
    }

    pub fn with_last_accessed(mut self, last_accessed: Option<Timestamp>) -> Self {
        self.last_accessed = last_accessed;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub links: Vec<LinkResponse>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub page_count: u64,
}

#[derive(Debug, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub error: ErrorInfo,
}

#[derive(Debug, Serialize)]
pub struct BatchCreateResponse {
    pub created: Vec<LinkResponse>,
    pub failed: Vec<BatchItemError>,
}
