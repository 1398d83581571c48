use crate::error::{AppError, Result};
use crate::model::{
    BatchCreateRequest, BatchCreateResponse, BatchItemError, CreateLinkRequest, DailyQuery,
    LinkResponse, ListQuery, ListResponse, MutationQuery, StatsQuery, UpdateLinkRequest,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use portal_core::{ClickSummary, DailyClicks, ListFilter, PageRequest, ShortCode};
use portal_shortener::{CreateLink, DEFAULT_DAILY_DAYS};

fn parse_code(code: String) -> Result<ShortCode> {
    ShortCode::parse(code).map_err(AppError::from)
}

pub async fn create_link_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<LinkResponse>)> {
    let record = state.links.create(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::new(record, state.base_url())),
    ))
}

pub async fn batch_create_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchCreateRequest>,
) -> Result<Json<BatchCreateResponse>> {
    let requests: Vec<CreateLink> = request.links.into_iter().map(Into::into).collect();
    let outcome = state.links.batch_create(requests).await?;

    Ok(Json(BatchCreateResponse {
        created: outcome
            .created
            .into_iter()
            .map(|record| LinkResponse::new(record, state.base_url()))
            .collect(),
        failed: outcome
            .failed
            .into_iter()
            .map(|failure| BatchItemError {
                index: failure.index,
                error: AppError::from(failure.error).info(),
            })
            .collect(),
    }))
}

pub async fn list_links_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let defaults = PageRequest::default();
    let page = PageRequest::new(
        query.page.unwrap_or(defaults.page),
        query.page_size.unwrap_or(defaults.page_size),
    );
    let filter = ListFilter {
        created_by: query.created_by,
        status: query.status,
        search: query.search.filter(|s| !s.is_empty()),
    };

    let result = state.links.list(&filter, page).await?;
    let page_count = result.page_count(page.page_size);
    Ok(Json(ListResponse {
        links: result
            .records
            .into_iter()
            .map(|record| LinkResponse::new(record, state.base_url()))
            .collect(),
        page: page.page,
        page_size: page.page_size,
        total: result.total,
        page_count,
    }))
}

pub async fn get_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LinkResponse>> {
    let info = state.links.info(&parse_code(code)?).await?;
    Ok(Json(
        LinkResponse::new(info.record, state.base_url()).with_last_accessed(info.last_accessed),
    ))
}

pub async fn update_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>> {
    let record = state
        .links
        .update(&parse_code(code)?, request.into())
        .await?;
    Ok(Json(LinkResponse::new(record, state.base_url())))
}

pub async fn disable_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<MutationQuery>,
) -> Result<Json<LinkResponse>> {
    let record = state
        .links
        .disable(&parse_code(code)?, query.version, query.updated_by)
        .await?;
    Ok(Json(LinkResponse::new(record, state.base_url())))
}

pub async fn delete_link_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<MutationQuery>,
) -> Result<StatusCode> {
    state
        .links
        .delete(&parse_code(code)?, query.version, query.updated_by)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn link_stats_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ClickSummary>> {
    let summary = state.links.stats(&parse_code(code)?, query.into()).await?;
    Ok(Json(summary))
}

pub async fn link_daily_stats_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<Vec<DailyClicks>>> {
    let days = query.days.unwrap_or(DEFAULT_DAILY_DAYS);
    let daily = state.links.daily(&parse_code(code)?, days).await?;
    Ok(Json(daily))
}
