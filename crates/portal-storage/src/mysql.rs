use crate::error::{is_unique_violation, map_sqlx_error};
use async_trait::async_trait;
use jiff::Timestamp;
use portal_core::repository::{ClickRepository, LinkRepository, Result};
use portal_core::{
    ClickEvent, ClickSummary, ClickWindow, DailyClicks, LinkChanges, LinkPage, LinkRecord, ListFilter,
    PageRequest, ShortCode, StorageError,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use tracing::debug;

const LINK_COLUMNS: &str = "short_code, long_url, status, expires_at, click_count, created_by, \
     updated_by, description, created_at, updated_at, version, deleted";

const SCHEMA: [&str; 2] = [
    include_str!("../ddl/mysql/links.sql"),
    include_str!("../ddl/mysql/click_events.sql"),
];

/// MySQL implementation of the store contracts.
///
/// Soft delete is implemented with the `deleted` flag. Reads only return live
/// records. Inserts never reuse an existing short code, including
/// soft-deleted rows, so click history stays attached to a single row per
/// code. Timestamps are stored as milliseconds since the Unix epoch.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        for ddl in SCHEMA {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn fetch_any(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE short_code = ? LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }
}

fn millis(ts: Timestamp) -> i64 {
    ts.as_millisecond()
}

fn parse_millis(column: &str, value: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(value).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{value}': {e}"))
    })
}

fn record_from_row(row: &MySqlRow) -> Result<LinkRecord> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let status: String = row.try_get("status").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;

    Ok(LinkRecord {
        short_code: ShortCode::new_unchecked(short_code),
        long_url: row.try_get("long_url").map_err(map_sqlx_error)?,
        status: status.parse().map_err(StorageError::InvalidData)?,
        expires_at: expires_at
            .map(|v| parse_millis("expires_at", v))
            .transpose()?,
        click_count: row.try_get("click_count").map_err(map_sqlx_error)?,
        created_by: row.try_get("created_by").map_err(map_sqlx_error)?,
        updated_by: row.try_get("updated_by").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        created_at: parse_millis("created_at", created_at)?,
        updated_at: parse_millis("updated_at", updated_at)?,
        version: row.try_get("version").map_err(map_sqlx_error)?,
        deleted: row.try_get("deleted").map_err(map_sqlx_error)?,
    })
}

fn push_filter(builder: &mut QueryBuilder<'_, MySql>, filter: &ListFilter) {
    builder.push(" WHERE deleted = 0");
    if let Some(created_by) = &filter.created_by {
        builder.push(" AND created_by = ").push_bind(created_by.clone());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (short_code LIKE ")
            .push_bind(pattern.clone())
            .push(" COLLATE utf8mb4_bin ESCAPE '!' OR long_url LIKE ")
            .push_bind(pattern)
            .push(" COLLATE utf8mb4_bin ESCAPE '!')");
    }
}

/// A case-sensitive substring pattern that treats `%` and `_` literally.
/// `!` is the escape character since backslash handling depends on sql_mode.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl LinkRepository for MySqlRepository {
    async fn create(&self, record: LinkRecord) -> Result<LinkRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (
                short_code, long_url, status, expires_at, click_count, created_by,
                updated_by, description, created_at, updated_at, version, deleted
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.short_code.as_str())
        .bind(&record.long_url)
        .bind(record.status.as_str())
        .bind(record.expires_at.map(millis))
        .bind(record.click_count)
        .bind(&record.created_by)
        .bind(&record.updated_by)
        .bind(&record.description)
        .bind(millis(record.created_at))
        .bind(millis(record.updated_at))
        .bind(record.version)
        .bind(record.deleted)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.short_code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<LinkRecord> {
        match self.fetch_any(code).await? {
            Some(record) if !record.deleted => Ok(record),
            _ => Err(StorageError::NotFound(code.to_string())),
        }
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn update_with_version(
        &self,
        code: &ShortCode,
        expected_version: u64,
        changes: &LinkChanges,
    ) -> Result<LinkRecord> {
        let mut builder = QueryBuilder::<MySql>::new("UPDATE links SET version = version + 1");
        builder
            .push(", updated_at = ")
            .push_bind(millis(Timestamp::now()));
        if let Some(url) = &changes.long_url {
            builder.push(", long_url = ").push_bind(url.clone());
        }
        if let Some(status) = changes.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some(expires_at) = changes.expires_at {
            builder
                .push(", expires_at = ")
                .push_bind(expires_at.map(millis));
        }
        if let Some(description) = &changes.description {
            builder
                .push(", description = ")
                .push_bind(description.clone());
        }
        if let Some(deleted) = changes.deleted {
            builder.push(", deleted = ").push_bind(deleted);
        }
        if let Some(updated_by) = &changes.updated_by {
            builder.push(", updated_by = ").push_bind(updated_by.clone());
        }
        builder
            .push(" WHERE short_code = ")
            .push_bind(code.as_str().to_owned())
            .push(" AND version = ")
            .push_bind(expected_version)
            .push(" AND deleted = 0");

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            debug!(code = %code, expected_version, "conditional update matched no row");
            return Err(StorageError::NotFound(code.to_string()));
        }

        // The row may now be soft-deleted, so read it without the live filter.
        self.fetch_any(code)
            .await?
            .ok_or_else(|| StorageError::NotFound(code.to_string()))
    }

    async fn increment_clicks(&self, code: &ShortCode, delta: u64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET click_count = click_count + ?
            WHERE short_code = ?
              AND deleted = 0
            "#,
        )
        .bind(delta)
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(code.to_string()));
        }
        Ok(())
    }

    async fn list(&self, filter: &ListFilter, page: PageRequest) -> Result<LinkPage> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM links");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let mut select = QueryBuilder::<MySql>::new(format!("SELECT {LINK_COLUMNS} FROM links"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, short_code ASC LIMIT ")
            .push_bind(page.page_size)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let records = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;
        Ok(LinkPage {
            records,
            total: total.max(0) as u64,
        })
    }

    async fn expire_due(&self, now: Timestamp) -> Result<Vec<ShortCode>> {
        let now = millis(now);
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let codes: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT short_code
            FROM links
            WHERE status = 'active'
              AND deleted = 0
              AND expires_at IS NOT NULL
              AND expires_at <= ?
            FOR UPDATE
            "#,
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if !codes.is_empty() {
            sqlx::query(
                r#"
                UPDATE links
                SET status = 'expired', version = version + 1, updated_at = ?
                WHERE status = 'active'
                  AND deleted = 0
                  AND expires_at IS NOT NULL
                  AND expires_at <= ?
                "#,
            )
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(codes.into_iter().map(ShortCode::new_unchecked).collect())
    }
}

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// `[since, until)` in stored milliseconds.
fn window_bounds(window: ClickWindow) -> (i64, i64) {
    (
        window.since.map(millis).unwrap_or(i64::MIN),
        window.until.map(millis).unwrap_or(i64::MAX),
    )
}

async fn grouped_counts(
    pool: &MySqlPool,
    column: &str,
    code: &ShortCode,
    (since, until): (i64, i64),
) -> Result<Vec<(String, u64)>> {
    let sql = format!(
        "SELECT {column} AS bucket, COUNT(*) AS hits FROM click_events \
         WHERE short_code = ? AND created_at >= ? AND created_at < ? GROUP BY {column}"
    );
    let rows = sqlx::query(&sql)
        .bind(code.as_str())
        .bind(since)
        .bind(until)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;

    rows.iter()
        .map(|row| {
            let bucket: String = row.try_get("bucket").map_err(map_sqlx_error)?;
            let hits: i64 = row.try_get("hits").map_err(map_sqlx_error)?;
            Ok((bucket, hits.max(0) as u64))
        })
        .collect()
}

/// Buckets by whole UTC days since the Unix epoch, so the session time zone
/// plays no part.
async fn daily_counts(
    pool: &MySqlPool,
    code: &ShortCode,
    (since, until): (i64, i64),
) -> Result<Vec<DailyClicks>> {
    let rows = sqlx::query(
        r#"
        SELECT created_at DIV ? AS day, COUNT(*) AS clicks, COUNT(DISTINCT ip) AS unique_ips
        FROM click_events
        WHERE short_code = ? AND created_at >= ? AND created_at < ?
        GROUP BY day
        ORDER BY day DESC
        "#,
    )
    .bind(MILLIS_PER_DAY)
    .bind(code.as_str())
    .bind(since)
    .bind(until)
    .fetch_all(pool)
    .await
    .map_err(map_sqlx_error)?;

    rows.iter()
        .map(|row| {
            let day: i64 = row.try_get("day").map_err(map_sqlx_error)?;
            let clicks: i64 = row.try_get("clicks").map_err(map_sqlx_error)?;
            let unique_ips: i64 = row.try_get("unique_ips").map_err(map_sqlx_error)?;
            let start = parse_millis("created_at", day.saturating_mul(MILLIS_PER_DAY))?;
            Ok(DailyClicks {
                date: portal_core::click::utc_date(start),
                clicks: clicks.max(0) as u64,
                unique_ips: unique_ips.max(0) as u64,
            })
        })
        .collect()
}

#[async_trait]
impl ClickRepository for MySqlRepository {
    async fn record(&self, event: ClickEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO click_events (short_code, ip, user_agent, referer, device, country, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.short_code.as_str())
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(&event.referer)
        .bind(event.device.as_str())
        .bind(&event.country)
        .bind(millis(event.created_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn last_accessed(&self, code: &ShortCode) -> Result<Option<Timestamp>> {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM click_events WHERE short_code = ?")
                .bind(code.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        last.map(|v| parse_millis("created_at", v)).transpose()
    }

    async fn summary(&self, code: &ShortCode, window: ClickWindow) -> Result<ClickSummary> {
        let bounds = window_bounds(window);
        let mut summary = ClickSummary::empty(code.clone());

        for (device, hits) in grouped_counts(&self.pool, "device", code, bounds).await? {
            summary.total += hits;
            summary.devices.insert(device, hits);
        }

        // Fold through the same rules as the in-memory store: empty means direct.
        for (referer, hits) in grouped_counts(&self.pool, "referer", code, bounds).await? {
            let key = if referer.is_empty() {
                portal_core::click::DIRECT_REFERER.to_string()
            } else {
                referer
            };
            *summary.referers.entry(key).or_default() += hits;
        }

        for (country, hits) in grouped_counts(&self.pool, "country", code, bounds).await? {
            if !country.is_empty() && country != portal_core::click::UNKNOWN_COUNTRY {
                summary.countries.insert(country, hits);
            }
        }

        summary.daily = daily_counts(&self.pool, code, bounds).await?;
        Ok(summary)
    }

    async fn daily(&self, code: &ShortCode, since: Timestamp) -> Result<Vec<DailyClicks>> {
        daily_counts(&self.pool, code, window_bounds(ClickWindow::since(since))).await
    }
}
