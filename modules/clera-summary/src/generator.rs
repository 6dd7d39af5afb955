// One portfolio summary, end to end.
//
// Callers must hold the per-user summary lock. Collaborator failures before
// the LLM call degrade to defaults; the LLM call, extraction and the final
// insert are hard failures. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use clera_common::UserSummaryRecord;

use crate::enrichment::{enrich_citations, LinkPreviewer};
use crate::error::{Result, SummaryError};
use crate::extract::parse_summary;
use crate::portfolio::{format_positions, PositionsClient, DEFAULT_POSITIONS_TIMEOUT, NO_POSITIONS};
use crate::prompt::{build_messages, Personalization};
use crate::traits::{AccountDirectory, ChatCompletionClient, PersonalizationSource, SummaryRepository};

#[derive(Clone, TypedBuilder)]
pub struct SummaryGenerator {
    accounts: Arc<dyn AccountDirectory>,
    positions: Arc<dyn PositionsClient>,
    personalization: Arc<dyn PersonalizationSource>,
    llm: Arc<dyn ChatCompletionClient>,
    previewer: Arc<dyn LinkPreviewer>,
    repository: Arc<dyn SummaryRepository>,
    #[builder(default = DEFAULT_POSITIONS_TIMEOUT)]
    positions_timeout: Duration,
}

impl SummaryGenerator {
    pub async fn generate(&self, user_id: Uuid) -> Result<UserSummaryRecord> {
        let portfolio = self.portfolio_text(user_id).await;
        let personalization = self.personalization_for(user_id).await;
        let today = Utc::now().date_naive();

        let messages = build_messages(&portfolio, &personalization, today);
        let completion = self.llm.complete(&messages).await?;

        let summary_text = parse_summary(&completion.content)?;
        let referenced_articles =
            enrich_citations(self.previewer.as_ref(), &completion.citations, today).await;

        let record = UserSummaryRecord {
            user_id,
            summary_text,
            referenced_articles,
            generated_at: Utc::now(),
            model_identifier: if completion.model.is_empty() {
                self.llm.model().to_string()
            } else {
                completion.model
            },
        };

        self.repository
            .insert(&record)
            .await
            .map_err(SummaryError::Persistence)?;

        info!(
            %user_id,
            articles = record.referenced_articles.len(),
            model = %record.model_identifier,
            "Portfolio summary generated"
        );
        Ok(record)
    }

    async fn portfolio_text(&self, user_id: Uuid) -> String {
        let account_id = match self.accounts.account_id(user_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(%user_id, "No linked brokerage account");
                return NO_POSITIONS.to_string();
            }
            Err(e) => {
                warn!(%user_id, error = %e, "Account lookup failed");
                return NO_POSITIONS.to_string();
            }
        };

        match tokio::time::timeout(self.positions_timeout, self.positions.positions(&account_id))
            .await
        {
            Ok(Ok(positions)) => format_positions(&positions),
            Ok(Err(e)) => {
                warn!(%user_id, error = %e, "Positions fetch failed");
                NO_POSITIONS.to_string()
            }
            Err(_) => {
                warn!(%user_id, timeout_ms = self.positions_timeout.as_millis() as u64, "Positions fetch timed out");
                NO_POSITIONS.to_string()
            }
        }
    }

    async fn personalization_for(&self, user_id: Uuid) -> Personalization {
        match self.personalization.personalization(user_id).await {
            Ok(Some(p)) => p,
            Ok(None) => Personalization::default(),
            Err(e) => {
                warn!(%user_id, error = %e, "Personalization lookup failed, using defaults");
                Personalization::default()
            }
        }
    }
}
