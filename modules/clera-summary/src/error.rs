use thiserror::Error;

pub type Result<T> = std::result::Result<T, SummaryError>;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] ai_client::AiError),

    #[error("Could not extract JSON from model output: {0}")]
    Extraction(String),

    #[error("Model output has no summary_text")]
    MissingSummary,

    #[error("Failed to persist summary: {0}")]
    Persistence(anyhow::Error),

    #[error("Failed to load summary: {0}")]
    Lookup(anyhow::Error),

    #[error("Generation task failed: {0}")]
    Task(tokio::task::JoinError),
}
