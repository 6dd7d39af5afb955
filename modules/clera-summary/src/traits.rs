use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use ai_client::{Completion, Message, OpenAi};
use clera_common::UserSummaryRecord;

use crate::prompt::Personalization;

/// Maps a user to their linked brokerage account.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn account_id(&self, user_id: Uuid) -> Result<Option<String>>;
}

#[async_trait]
pub trait PersonalizationSource: Send + Sync {
    async fn personalization(&self, user_id: Uuid) -> Result<Option<Personalization>>;
}

/// Append-only store of generated summaries.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    /// Newest record by `generated_at`.
    async fn latest(&self, user_id: Uuid) -> Result<Option<UserSummaryRecord>>;

    async fn insert(&self, record: &UserSummaryRecord) -> Result<()>;
}

#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[Message]) -> ai_client::Result<Completion>;
}

#[async_trait]
impl ChatCompletionClient for OpenAi {
    fn model(&self) -> &str {
        OpenAi::model(self)
    }

    async fn complete(&self, messages: &[Message]) -> ai_client::Result<Completion> {
        self.chat(messages).await
    }
}
