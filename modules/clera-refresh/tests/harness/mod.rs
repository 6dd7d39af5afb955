//! Shared fixtures: an in-process cron endpoint that records every call.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::get, Router};

#[derive(Clone, Default)]
pub struct CronCalls {
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl CronCalls {
    pub fn all(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

async fn record(path: &'static str, calls: CronCalls, headers: HeaderMap) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let authorized = auth.as_deref() == Some("Bearer cron-secret");
    calls.calls.lock().unwrap().push((path.to_string(), auth));
    if authorized {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

/// Serves both cron paths; only `Bearer cron-secret` is accepted.
pub async fn cron_server() -> (String, CronCalls) {
    let calls = CronCalls::default();
    let app = Router::new()
        .route(
            "/api/cron/update-trending-news",
            get(|State(c): State<CronCalls>, h: HeaderMap| record("/api/cron/update-trending-news", c, h)),
        )
        .route(
            "/api/cron/update-watchlist-news",
            get(|State(c): State<CronCalls>, h: HeaderMap| record("/api/cron/update-watchlist-news", c, h)),
        )
        .with_state(calls.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}
