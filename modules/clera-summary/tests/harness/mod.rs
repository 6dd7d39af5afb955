//! Shared fixtures: an in-process site plus trading backend that records
//! every request it sees.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};

pub const BACKEND_KEY: &str = "backend-key";

/// One recorded request: path plus the headers the adapters are expected to send.
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Default)]
pub struct Requests {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Requests {
    pub fn all(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.all().into_iter().map(|s| s.path).collect()
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap) {
        let value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        self.seen.lock().unwrap().push(Seen {
            path: uri.path().to_string(),
            user_agent: value("user-agent"),
            accept_language: value("accept-language"),
            api_key: value("x-api-key"),
        });
    }
}

const ARTICLE: &str = r#"<html><head>
<title>Fallback title</title>
<meta property="og:title" content="Fed holds rates steady">
<meta name="description" content="Policymakers kept the benchmark rate unchanged for a third meeting.">
</head><body><p>Short.</p></body></html>"#;

async fn article(State(r): State<Requests>, uri: Uri, headers: HeaderMap) -> Html<&'static str> {
    r.record(&uri, &headers);
    Html(ARTICLE)
}

async fn moved(State(r): State<Requests>, uri: Uri, headers: HeaderMap) -> Redirect {
    r.record(&uri, &headers);
    Redirect::temporary("/article")
}

async fn report(State(r): State<Requests>, uri: Uri, headers: HeaderMap) -> Response {
    r.record(&uri, &headers);
    (
        [(header::CONTENT_TYPE, "application/pdf")],
        "%PDF-1.7 <title>not html</title>",
    )
        .into_response()
}

async fn missing(State(r): State<Requests>, uri: Uri, headers: HeaderMap) -> StatusCode {
    r.record(&uri, &headers);
    StatusCode::NOT_FOUND
}

/// `acct-broken` answers 500; anything without `X-API-Key: backend-key` gets 401.
async fn positions(
    State(r): State<Requests>,
    Path(account): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    r.record(&uri, &headers);
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if key != Some(BACKEND_KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if account == "acct-broken" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(serde_json::json!([
        {"symbol": "AAPL", "qty": "10", "market_value": "1900.00"},
        {"symbol": "VTI", "qty": 2.5}
    ]))
    .into_response()
}

pub async fn test_server() -> (String, Requests) {
    let requests = Requests::default();
    let app = Router::new()
        .route("/article", get(article))
        .route("/moved", get(moved))
        .route("/report.pdf", get(report))
        .route("/missing", get(missing))
        .route("/api/portfolio/{account}/positions", get(positions))
        .with_state(requests.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), requests)
}
