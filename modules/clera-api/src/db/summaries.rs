use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use clera_common::{EnrichedArticle, UserSummaryRecord};
use clera_summary::SummaryRepository;

#[derive(sqlx::FromRow)]
struct SummaryRow {
    user_id: Uuid,
    summary_text: String,
    referenced_articles: Option<Json<Vec<EnrichedArticle>>>,
    generated_at: DateTime<Utc>,
    perplexity_model: Option<String>,
}

impl From<SummaryRow> for UserSummaryRecord {
    fn from(row: SummaryRow) -> Self {
        UserSummaryRecord {
            user_id: row.user_id,
            summary_text: row.summary_text,
            referenced_articles: row.referenced_articles.map(|j| j.0).unwrap_or_default(),
            generated_at: row.generated_at,
            model_identifier: row.perplexity_model.unwrap_or_default(),
        }
    }
}

/// `user_daily_summaries`: insert-only, newest row wins.
#[derive(Clone)]
pub struct PgSummaryStore {
    pool: PgPool,
}

impl PgSummaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SummaryRepository for PgSummaryStore {
    async fn latest(&self, user_id: Uuid) -> Result<Option<UserSummaryRecord>> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT user_id, summary_text, referenced_articles, generated_at, perplexity_model
            FROM user_daily_summaries
            WHERE user_id = $1
            ORDER BY generated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserSummaryRecord::from))
    }

    async fn insert(&self, record: &UserSummaryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_daily_summaries
                (user_id, summary_text, referenced_articles, generated_at, perplexity_model)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.user_id)
        .bind(&record.summary_text)
        .bind(Json(&record.referenced_articles))
        .bind(record.generated_at)
        .bind(&record.model_identifier)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
