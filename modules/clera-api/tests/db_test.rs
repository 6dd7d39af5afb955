//! Integration tests for the Postgres adapters.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use clera_api::db::{PgAccountDirectory, PgNewsStore, PgPersonalization, PgSummaryStore};
use clera_common::{EnrichedArticle, NewsFeed, UserSummaryRecord};
use clera_refresh::NewsCacheStore;
use clera_summary::{AccountDirectory, PersonalizationSource, SummaryRepository};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS trending_news_metadata (
        id           BIGSERIAL PRIMARY KEY,
        last_updated TIMESTAMPTZ,
        next_update  TIMESTAMPTZ
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cached_trending_news (
        id              BIGSERIAL PRIMARY KEY,
        title           TEXT NOT NULL,
        url             TEXT NOT NULL,
        snippet         TEXT,
        source          TEXT,
        published_at    TIMESTAMPTZ,
        image_url       TEXT,
        sentiment_score REAL,
        category        TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS user_daily_summaries (
        id                  BIGSERIAL PRIMARY KEY,
        user_id             UUID NOT NULL,
        summary_text        TEXT NOT NULL,
        referenced_articles JSONB,
        generated_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
        perplexity_model    TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS user_onboarding (
        user_id           UUID PRIMARY KEY,
        alpaca_account_id TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS user_personalization (
        user_id                  UUID PRIMARY KEY,
        investment_goals         TEXT[],
        financial_literacy_level TEXT,
        risk_tolerance           TEXT
    )"#,
];

/// Get a test database pool, or skip if no test DB is available.
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await.ok()?;
    }
    sqlx::query("TRUNCATE trending_news_metadata, cached_trending_news RESTART IDENTITY")
        .execute(&pool)
        .await
        .ok()?;

    Some(pool)
}

#[tokio::test]
async fn news_metadata_and_articles() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgNewsStore::new(pool.clone());

    assert!(store.metadata(NewsFeed::Trending).await.unwrap().is_none());

    let next = Utc::now() + Duration::hours(2);
    sqlx::query("INSERT INTO trending_news_metadata (last_updated, next_update) VALUES (now(), $1)")
        .bind(next)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        r#"INSERT INTO cached_trending_news (title, url, published_at, sentiment_score, category)
           VALUES ('Older', 'https://a.example/1', now() - interval '2 hours', 0.5, 'macro'),
                  ('Newer', 'https://a.example/2', now(), -0.25, 'tech')"#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let metadata = store.metadata(NewsFeed::Trending).await.unwrap().unwrap();
    assert!(metadata.last_updated.is_some());
    assert_eq!(
        metadata.next_update.map(|t| t.timestamp()),
        Some(next.timestamp())
    );

    let all = store.articles(NewsFeed::Trending, None).await.unwrap();
    assert_eq!(
        all.iter().map(|a| a.title.as_str()).collect::<Vec<_>>(),
        vec!["Newer", "Older"]
    );
    assert_eq!(all[0].sentiment_score, Some(-0.25));

    let macro_only = store.articles(NewsFeed::Trending, Some("macro")).await.unwrap();
    assert_eq!(macro_only.len(), 1);
    assert_eq!(macro_only[0].title, "Older");
}

#[tokio::test]
async fn summaries_latest_wins() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgSummaryStore::new(pool);
    let user = Uuid::new_v4();

    assert!(store.latest(user).await.unwrap().is_none());

    let article = EnrichedArticle {
        url: "https://reuters.com/x".to_string(),
        title: "Fed holds".to_string(),
        snippet: "Rates unchanged".to_string(),
        source: "reuters.com".to_string(),
        sentiment_score: 0.1,
        should_display: true,
        used_for_paragraph: None,
    };
    let older = UserSummaryRecord {
        user_id: user,
        summary_text: "older".to_string(),
        referenced_articles: vec![],
        generated_at: Utc::now() - Duration::hours(30),
        model_identifier: "sonar-pro".to_string(),
    };
    let newer = UserSummaryRecord {
        summary_text: "newer".to_string(),
        referenced_articles: vec![article.clone()],
        generated_at: Utc::now(),
        ..older.clone()
    };
    store.insert(&newer).await.unwrap();
    store.insert(&older).await.unwrap();

    let latest = store.latest(user).await.unwrap().unwrap();
    assert_eq!(latest.summary_text, "newer");
    assert_eq!(latest.referenced_articles, vec![article]);
    assert_eq!(latest.model_identifier, "sonar-pro");
}

#[tokio::test]
async fn account_and_personalization_lookups() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let accounts = PgAccountDirectory::new(pool.clone());
    let personalization = PgPersonalization::new(pool.clone());
    let user = Uuid::new_v4();

    assert_eq!(accounts.account_id(user).await.unwrap(), None);
    assert_eq!(personalization.personalization(user).await.unwrap(), None);

    sqlx::query("INSERT INTO user_onboarding (user_id, alpaca_account_id) VALUES ($1, 'acct-42')")
        .bind(user)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO user_personalization (user_id, investment_goals, financial_literacy_level) \
         VALUES ($1, ARRAY['retirement'], NULL)",
    )
    .bind(user)
    .execute(&pool)
    .await
    .unwrap();

    assert_eq!(
        accounts.account_id(user).await.unwrap().as_deref(),
        Some("acct-42")
    );
    let p = personalization.personalization(user).await.unwrap().unwrap();
    assert_eq!(p.investment_goals, vec!["retirement".to_string()]);
    assert_eq!(p.financial_literacy.as_deref(), Some("intermediate"));
    assert_eq!(p.risk_tolerance, None);
}
