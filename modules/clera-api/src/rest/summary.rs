use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{error, warn};

use clera_summary::SummaryRead;

use crate::auth::{constant_time_eq, AuthUser};
use crate::AppState;

const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Deserialize)]
pub struct SummaryQuery {
    force: Option<String>,
    regenerate: Option<String>,
}

impl SummaryQuery {
    fn wants_force(&self) -> bool {
        [&self.force, &self.regenerate]
            .into_iter()
            .flatten()
            .any(|v| matches!(v.trim(), "1" | "true"))
    }
}

/// Forcing is open outside production; in production it needs the admin key.
fn may_force(state: &AppState, headers: &HeaderMap) -> bool {
    if !state.is_production {
        return true;
    }
    let Some(secret) = state.admin_secret.as_deref() else {
        return false;
    };
    headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| constant_time_eq(key.as_bytes(), secret.as_bytes()))
}

pub async fn api_portfolio_summary(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    headers: HeaderMap,
    Query(params): Query<SummaryQuery>,
) -> Response {
    let force = params.wants_force();
    if force && !may_force(&state, &headers) {
        warn!(user_id = %user.id, "Rejected unauthorized forced regeneration");
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Forbidden"})),
        )
            .into_response();
    }

    match state.summaries.read(user.id, force).await {
        Ok(SummaryRead::InProgress) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({
                "message": "Summary generation in progress. Please check back shortly."
            })),
        )
            .into_response(),
        Ok(SummaryRead::Fresh(record) | SummaryRead::Generated(record) | SummaryRead::Stale(record)) => {
            Json(record.to_response()).into_response()
        }
        Err(e) => {
            error!(user_id = %user.id, force, error = %e, "Portfolio summary failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Failed to generate portfolio summary",
                    "detail": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
