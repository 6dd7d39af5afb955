//! Router tests: every collaborator is a fake; the cron endpoint is a real
//! in-process server so background triggers can be observed.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    routing::get,
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use clera_api::auth::SupabaseAuth;
use clera_api::{router, AppState};
use clera_common::{CacheMetadata, NewsFeed};
use clera_refresh::testing::{article, MemoryStore, MockNewsStore};
use clera_refresh::{DistributedLock, KvStore, NewsCache, RefreshEndpoint, RefreshTrigger};
use clera_summary::testing::{
    record_for, FakePositions, FakePreviewer, FixedAccounts, FixedPersonalization, MemorySummaries,
    ScriptedLlm,
};
use clera_summary::{SummaryGenerator, SummaryService};

const JWT_SECRET: &str = "jwt-secret";
const CRON_SECRET: &str = "cron-secret";
const ADMIN_SECRET: &str = "admin-secret";

// =========================================================================
// Fixtures
// =========================================================================

type CronCalls = Arc<Mutex<Vec<(String, Option<String>)>>>;

async fn cron_server() -> (String, CronCalls) {
    async fn record(
        State(calls): State<CronCalls>,
        uri: axum::http::Uri,
        headers: HeaderMap,
    ) -> StatusCode {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        calls.lock().unwrap().push((uri.path().to_string(), auth));
        StatusCode::OK
    }

    let calls = CronCalls::default();
    let app = Router::new()
        .route("/api/cron/update-trending-news", get(record))
        .route("/api/cron/update-watchlist-news", get(record))
        .with_state(calls.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    llm: Arc<ScriptedLlm>,
    cron: CronCalls,
}

struct Setup {
    news: MockNewsStore,
    llm: ScriptedLlm,
    summaries: MemorySummaries,
    production: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            news: MockNewsStore::new(),
            llm: ScriptedLlm::summary("Markets were mixed.\n\nYour holdings were steady."),
            summaries: MemorySummaries::new(),
            production: false,
        }
    }
}

async fn app(setup: Setup) -> TestApp {
    let (cron_base, cron) = cron_server().await;
    let store = Arc::new(MemoryStore::new());
    let news = Arc::new(setup.news);
    let http = reqwest::Client::new();
    let endpoint = RefreshEndpoint::new(cron_base, CRON_SECRET);
    let cache = |feed: NewsFeed| {
        NewsCache::new(
            news.clone(),
            Arc::new(RefreshTrigger::new(
                feed,
                store.clone(),
                http.clone(),
                endpoint.clone(),
            )),
        )
    };

    let llm = Arc::new(setup.llm);
    let summaries = Arc::new(setup.summaries);
    let generator = SummaryGenerator::builder()
        .accounts(Arc::new(FixedAccounts::linked("acct-1")))
        .positions(Arc::new(FakePositions::new(&[("AAPL", "10")])))
        .personalization(Arc::new(FixedPersonalization::default()))
        .llm(llm.clone())
        .previewer(Arc::new(FakePreviewer::new()))
        .repository(summaries.clone())
        .build();

    let state = Arc::new(AppState {
        trending: cache(NewsFeed::Trending),
        watchlist: cache(NewsFeed::Watchlist),
        summaries: SummaryService::new(summaries, generator, DistributedLock::new(store.clone())),
        auth: SupabaseAuth::new(JWT_SECRET),
        admin_secret: Some(ADMIN_SECRET.to_string()),
        is_production: setup.production,
    });

    TestApp {
        router: router(state),
        store,
        llm,
        cron,
    }
}

fn token_for(user: Uuid) -> String {
    let claims = json!({
        "sub": user.to_string(),
        "aud": "authenticated",
        "exp": Utc::now().timestamp() + 3600,
        "role": "authenticated",
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn get_request(uri: &str, headers: &[(&str, String)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, headers, json)
}

fn bearer(user: Uuid) -> (&'static str, String) {
    ("authorization", format!("Bearer {}", token_for(user)))
}

fn metadata(hours_until_next: i64) -> CacheMetadata {
    let now = Utc::now();
    CacheMetadata {
        id: 1,
        last_updated: Some(now - chrono::Duration::hours(1)),
        next_update: Some(now + chrono::Duration::hours(hours_until_next)),
    }
}

// =========================================================================
// Health and headers
// =========================================================================

#[tokio::test]
async fn health_is_ok_and_uncached() {
    let app = app(Setup::default()).await;
    for path in ["/", "/health"] {
        let (status, headers, body) = send(&app, get_request(path, &[])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(headers["cache-control"], "no-store");
    }
}

// =========================================================================
// Shared news caches
// =========================================================================

#[tokio::test]
async fn fresh_trending_news_is_served_without_lock_traffic() {
    let app = app(Setup {
        news: MockNewsStore::new()
            .with_metadata(NewsFeed::Trending, metadata(2))
            .with_articles(
                NewsFeed::Trending,
                vec![article("Fed holds", Some("macro")), article("Chips rally", Some("tech"))],
            ),
        ..Default::default()
    })
    .await;

    let (status, _, body) = send(&app, get_request("/api/news/trending", &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["articles"].as_array().unwrap().len(), 2);
    assert!(body["last_updated"].is_string());
    assert!(body["next_update"].is_string());

    let (_, _, filtered) = send(&app, get_request("/api/news/trending?category=tech", &[])).await;
    let articles = filtered["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Chips rally");

    assert_eq!(app.store.set_if_absent_calls(), 0);
    assert!(app.cron.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_watchlist_metadata_triggers_one_background_refresh() {
    let app = app(Setup {
        news: MockNewsStore::new()
            .with_articles(NewsFeed::Watchlist, vec![article("Old story", None)]),
        ..Default::default()
    })
    .await;

    let (status, _, body) = send(&app, get_request("/api/news/watchlist", &[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["articles"][0]["title"], "Old story");
    assert!(body["last_updated"].is_null());

    // The trigger runs detached; give it a moment to land.
    for _ in 0..100 {
        if !app.cron.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let calls = app.cron.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![(
            "/api/cron/update-watchlist-news".to_string(),
            Some(format!("Bearer {CRON_SECRET}"))
        )]
    );
    assert_eq!(app.store.set_if_absent_calls(), 1);
}

// =========================================================================
// Portfolio summary
// =========================================================================

#[tokio::test]
async fn summary_requires_authentication() {
    let app = app(Setup::default()).await;

    let (status, _, body) = send(&app, get_request("/api/news/portfolio-summary", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _, _) = send(
        &app,
        get_request(
            "/api/news/portfolio-summary",
            &[("authorization", "Bearer not-a-jwt".to_string())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn fresh_summary_is_returned_from_storage() {
    let user = Uuid::new_v4();
    let app = app(Setup {
        summaries: MemorySummaries::new().with_record(record_for(user, 3, "Stored summary")),
        ..Default::default()
    })
    .await;

    let (status, _, body) = send(
        &app,
        get_request("/api/news/portfolio-summary", &[bearer(user)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary_text"], "Stored summary");
    assert_eq!(body["perplexity_model"], "sonar-pro");
    assert!(body["referenced_articles"].is_array());
    assert!(body["generated_at"].is_string());
    assert_eq!(app.llm.calls(), 0);
    assert_eq!(app.store.set_if_absent_calls(), 0);
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let user = Uuid::new_v4();
    let app = app(Setup {
        summaries: MemorySummaries::new().with_record(record_for(user, 1, "Cookie summary")),
        ..Default::default()
    })
    .await;

    let cookie = format!("theme=dark; sb-access-token={}", token_for(user));
    let (status, _, body) = send(
        &app,
        get_request("/api/news/portfolio-summary", &[("cookie", cookie)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary_text"], "Cookie summary");
}

#[tokio::test]
async fn missing_summary_is_generated_on_request() {
    let user = Uuid::new_v4();
    let app = app(Setup::default()).await;

    let (status, _, body) = send(
        &app,
        get_request("/api/news/portfolio-summary", &[bearer(user)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["summary_text"],
        "Markets were mixed.\n\nYour holdings were steady."
    );
    assert_eq!(app.llm.calls(), 1);
}

#[tokio::test]
async fn generation_in_progress_returns_202() {
    let user = Uuid::new_v4();
    let app = app(Setup::default()).await;
    app.store
        .set_if_absent(
            &clera_common::summary_lock_key(&user),
            "other-instance",
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    let (status, _, body) = send(
        &app,
        get_request("/api/news/portfolio-summary", &[bearer(user)]),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["message"].as_str().unwrap().contains("in progress"));
    assert_eq!(app.llm.calls(), 0);
}

#[tokio::test]
async fn failed_generation_without_history_is_500_with_detail() {
    let user = Uuid::new_v4();
    let app = app(Setup {
        llm: ScriptedLlm::new("no json here"),
        ..Default::default()
    })
    .await;

    let (status, _, body) = send(
        &app,
        get_request("/api/news/portfolio-summary", &[bearer(user)]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate portfolio summary");
    assert!(body["detail"].as_str().unwrap().contains("JSON"));
}

#[tokio::test]
async fn failed_generation_with_history_serves_previous_record() {
    let user = Uuid::new_v4();
    let app = app(Setup {
        llm: ScriptedLlm::failing(),
        summaries: MemorySummaries::new().with_record(record_for(user, 30, "Yesterday")),
        ..Default::default()
    })
    .await;

    let (status, _, body) = send(
        &app,
        get_request("/api/news/portfolio-summary", &[bearer(user)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary_text"], "Yesterday");
}

#[tokio::test]
async fn forced_regeneration_in_production_needs_admin_key() {
    let user = Uuid::new_v4();
    let app = app(Setup {
        production: true,
        summaries: MemorySummaries::new().with_record(record_for(user, 1, "Recent")),
        ..Default::default()
    })
    .await;

    let (status, _, _) = send(
        &app,
        get_request("/api/news/portfolio-summary?force=1", &[bearer(user)]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &app,
        get_request(
            "/api/news/portfolio-summary?regenerate=1",
            &[bearer(user), ("x-admin-key", "wrong".to_string())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.llm.calls(), 0);

    let (status, _, body) = send(
        &app,
        get_request(
            "/api/news/portfolio-summary?force=1",
            &[bearer(user), ("x-admin-key", ADMIN_SECRET.to_string())],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["summary_text"],
        "Markets were mixed.\n\nYour holdings were steady."
    );
    assert_eq!(app.llm.calls(), 1);
}

#[tokio::test]
async fn forced_regeneration_is_open_outside_production() {
    let user = Uuid::new_v4();
    let app = app(Setup {
        summaries: MemorySummaries::new().with_record(record_for(user, 1, "Recent")),
        ..Default::default()
    })
    .await;

    let (status, _, _) = send(
        &app,
        get_request("/api/news/portfolio-summary?regenerate=true", &[bearer(user)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.llm.calls(), 1);
}

#[tokio::test]
async fn forced_failure_surfaces_as_500() {
    let user = Uuid::new_v4();
    let app = app(Setup {
        llm: ScriptedLlm::failing(),
        summaries: MemorySummaries::new().with_record(record_for(user, 30, "Yesterday")),
        ..Default::default()
    })
    .await;

    let (status, _, body) = send(
        &app,
        get_request("/api/news/portfolio-summary?force=1", &[bearer(user)]),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
}
