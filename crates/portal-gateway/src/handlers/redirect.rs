use crate::client_ip::client_ip;
use crate::error::Result;
use crate::state::AppState;
use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use portal_core::{ClickContext, ShortCode};
use std::net::SocketAddr;
use tracing::debug;

/// `GET /{code}`: answers `302 Found` towards the destination.
///
/// Click accounting is scheduled by the resolver and does not hold up the
/// response.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
    request: Request,
) -> Result<impl IntoResponse> {
    let code = ShortCode::parse(code)?;

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let context = click_context(request.headers(), peer);

    let resolved = state.redirector.resolve(&code, context).await?;
    debug!(code = %code, source = %resolved.source, "redirecting");

    Ok((StatusCode::FOUND, [(header::LOCATION, resolved.url)]))
}

fn click_context(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClickContext {
    let text = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    ClickContext {
        ip: client_ip(headers, peer),
        user_agent: text(header::USER_AGENT),
        referer: text(header::REFERER),
    }
}
