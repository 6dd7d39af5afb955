mod client;
pub(crate) mod types;

use std::time::Duration;

use crate::error::{AiError, Result};
use crate::traits::Message;

use client::OpenAiClient;
use types::ChatRequest;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How much web content a search-grounded model pulls in per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchContextSize {
    Low,
    Medium,
    High,
}

impl SearchContextSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchContextSize::Low => "low",
            SearchContextSize::Medium => "medium",
            SearchContextSize::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(SearchContextSize::Low),
            "medium" => Some(SearchContextSize::Medium),
            "high" => Some(SearchContextSize::High),
            _ => None,
        }
    }
}

/// Assistant text plus the source URLs the provider searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub citations: Vec<String>,
    pub model: String,
}

// =============================================================================
// OpenAi Agent
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: String,
    search_context_size: Option<SearchContextSize>,
    temperature: Option<f32>,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            search_context_size: None,
            temperature: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Perplexity speaks the OpenAI wire format from its own base URL.
    pub fn perplexity(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(api_key, model).with_base_url(PERPLEXITY_API_URL)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_search_context_size(mut self, size: SearchContextSize) -> Self {
        self.search_context_size = Some(size);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn client(&self) -> Result<OpenAiClient> {
        if self.api_key.is_empty() {
            return Err(AiError::Config("API key is not set".to_string()));
        }
        OpenAiClient::new(&self.api_key, &self.base_url, self.timeout)
    }

    fn request(&self, messages: &[Message]) -> ChatRequest {
        let mut request = ChatRequest::new(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        if let Some(size) = self.search_context_size {
            request = request.search_context_size(size.as_str());
        }
        request
    }

    /// Chat completion returning the first choice's content and any citations.
    pub async fn chat(&self, messages: &[Message]) -> Result<Completion> {
        let request = self.request(messages);
        let response = self.client()?.chat(&request).await?;

        let model = response.model.clone().unwrap_or_else(|| self.model.clone());
        let citations = response.citations;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AiError::Empty(format!("no content from {}", self.base_url)))?;

        Ok(Completion {
            content,
            citations,
            model,
        })
    }

    /// Simple system + user chat completion.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<Completion> {
        self.chat(&[Message::system(system), Message::user(user)])
            .await
    }
}
