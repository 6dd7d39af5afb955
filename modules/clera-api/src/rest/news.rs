use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use clera_refresh::NewsCache;

use crate::AppState;

#[derive(Deserialize)]
pub struct NewsQuery {
    category: Option<String>,
}

pub async fn api_trending_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsQuery>,
) -> Response {
    read_feed(&state.trending, params).await
}

pub async fn api_watchlist_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsQuery>,
) -> Response {
    read_feed(&state.watchlist, params).await
}

/// Answers from the cache; a refresh, if any, runs detached.
async fn read_feed(cache: &NewsCache, params: NewsQuery) -> Response {
    let category = params.category.as_deref().map(str::trim).filter(|c| !c.is_empty());

    match cache.read(category).await {
        Ok(snapshot) => {
            if snapshot.refresh.is_some() {
                info!(feed = %snapshot.feed, staleness = ?snapshot.staleness, "Serving cached news while refreshing");
            }
            Json(snapshot.to_response()).into_response()
        }
        Err(e) => {
            warn!(feed = %cache.feed(), error = %e, "Failed to load cached news");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Failed to load news"})),
            )
                .into_response()
        }
    }
}
