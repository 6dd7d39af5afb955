use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use clera_summary::{AccountDirectory, Personalization, PersonalizationSource};

/// Brokerage account ids from `user_onboarding`.
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn account_id(&self, user_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (Option<String>,)>(
            "SELECT alpaca_account_id FROM user_onboarding WHERE user_id = $1 LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .and_then(|(id,)| id)
            .filter(|id| !id.trim().is_empty()))
    }
}

#[derive(sqlx::FromRow)]
struct PersonalizationRow {
    investment_goals: Option<Vec<String>>,
    financial_literacy_level: Option<String>,
    risk_tolerance: Option<String>,
}

#[derive(Clone)]
pub struct PgPersonalization {
    pool: PgPool,
}

impl PgPersonalization {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonalizationSource for PgPersonalization {
    async fn personalization(&self, user_id: Uuid) -> Result<Option<Personalization>> {
        let row = sqlx::query_as::<_, PersonalizationRow>(
            r#"
            SELECT investment_goals, financial_literacy_level, risk_tolerance
            FROM user_personalization
            WHERE user_id = $1
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            let defaults = Personalization::default();
            Personalization {
                investment_goals: r.investment_goals.unwrap_or_default(),
                financial_literacy: r.financial_literacy_level.or(defaults.financial_literacy),
                risk_tolerance: r.risk_tolerance,
            }
        }))
    }
}
