use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    batch_create_handler, create_link_handler, delete_link_handler, disable_link_handler,
    get_link_handler, health_handler, link_daily_stats_handler, link_stats_handler,
    list_links_handler, redirect_handler, update_link_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/v1/links",
                Router::new()
                    .route("/", post(create_link_handler).get(list_links_handler))
                    .route("/batch", post(batch_create_handler))
                    .route(
                        "/{code}",
                        get(get_link_handler)
                            .patch(update_link_handler)
                            .delete(delete_link_handler),
                    )
                    .route("/{code}/disable", post(disable_link_handler))
                    .route("/{code}/stats", get(link_stats_handler))
                    .route("/{code}/stats/daily", get(link_daily_stats_handler)),
            )
            .route("/{code}", get(redirect_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
