pub mod auth;
pub mod db;
pub mod rest;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use clera_refresh::NewsCache;
use clera_summary::SummaryService;

use auth::SupabaseAuth;

pub struct AppState {
    pub trending: NewsCache,
    pub watchlist: NewsCache,
    pub summaries: SummaryService,
    pub auth: SupabaseAuth,
    pub admin_secret: Option<String>,
    pub is_production: bool,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(rest::health))
        .route("/health", get(rest::health))
        // News
        .route("/api/news/trending", get(rest::news::api_trending_news))
        .route("/api/news/watchlist", get(rest::news::api_watchlist_news))
        .route(
            "/api/news/portfolio-summary",
            get(rest::summary::api_portfolio_summary),
        )
        .with_state(state)
        // Responses are per-user or refreshed in the background; never cache
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only (no query params, no IP)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
