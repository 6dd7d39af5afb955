use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use clera_common::{CacheMetadata, CachedArticle, NewsFeed};
use clera_refresh::NewsCacheStore;

/// Row from `cached_trending_news` / `watchlist_cached_news`.
#[derive(sqlx::FromRow)]
struct ArticleRow {
    title: String,
    url: String,
    snippet: Option<String>,
    source: Option<String>,
    published_at: Option<DateTime<Utc>>,
    image_url: Option<String>,
    sentiment_score: Option<f64>,
    category: Option<String>,
}

impl From<ArticleRow> for CachedArticle {
    fn from(row: ArticleRow) -> Self {
        CachedArticle {
            title: row.title,
            url: row.url,
            snippet: row.snippet,
            source: row.source,
            published_at: row.published_at,
            image_url: row.image_url,
            sentiment_score: row.sentiment_score,
            category: row.category,
        }
    }
}

/// Reads the tables the regeneration jobs write.
#[derive(Clone)]
pub struct PgNewsStore {
    pool: PgPool,
}

impl PgNewsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NewsCacheStore for PgNewsStore {
    async fn metadata(&self, feed: NewsFeed) -> Result<Option<CacheMetadata>> {
        // Table names are compile-time constants, never user input.
        let sql = format!(
            "SELECT id::bigint, last_updated, next_update FROM {} ORDER BY id LIMIT 1",
            feed.metadata_table()
        );
        let row = sqlx::query_as::<_, (i64, Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id, last_updated, next_update)| CacheMetadata {
            id,
            last_updated,
            next_update,
        }))
    }

    async fn articles(&self, feed: NewsFeed, category: Option<&str>) -> Result<Vec<CachedArticle>> {
        let sql = format!(
            r#"
            SELECT title, url, snippet, source, published_at, image_url,
                   sentiment_score::float8 AS sentiment_score, category
            FROM {}
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY published_at DESC NULLS LAST
            "#,
            feed.articles_table()
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CachedArticle::from).collect())
    }
}
