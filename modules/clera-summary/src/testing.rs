// Test doubles for summary generation.
//
// - FixedAccounts (AccountDirectory)
// - FakePositions (PositionsClient): fixed rows, optional delay or failure
// - FixedPersonalization (PersonalizationSource)
// - ScriptedLlm (ChatCompletionClient): canned content and citations
// - FakePreviewer (LinkPreviewer): per-URL previews, unknown URLs fail
// - MemorySummaries (SummaryRepository): in-memory, append-only

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ai_client::{AiError, Completion, Message};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use clera_common::UserSummaryRecord;

use crate::enrichment::{LinkPreview, LinkPreviewer};
use crate::portfolio::{Position, PositionsClient, Quantity};
use crate::prompt::Personalization;
use crate::traits::{AccountDirectory, ChatCompletionClient, PersonalizationSource, SummaryRepository};

// ---------------------------------------------------------------------------
// Accounts / positions / personalization
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FixedAccounts {
    account_id: Option<String>,
    failing: bool,
}

impl FixedAccounts {
    pub fn linked(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            failing: false,
        }
    }

    pub fn unlinked() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            account_id: None,
            failing: true,
        }
    }
}

#[async_trait]
impl AccountDirectory for FixedAccounts {
    async fn account_id(&self, _user_id: Uuid) -> Result<Option<String>> {
        if self.failing {
            bail!("FixedAccounts: lookup failed");
        }
        Ok(self.account_id.clone())
    }
}

#[derive(Default)]
pub struct FakePositions {
    positions: Vec<Position>,
    delay: Option<Duration>,
    failing: bool,
    requested: Mutex<Vec<String>>,
}

impl FakePositions {
    pub fn new(rows: &[(&str, &str)]) -> Self {
        Self {
            positions: rows
                .iter()
                .map(|(symbol, qty)| Position {
                    symbol: symbol.to_string(),
                    qty: Quantity::Text(qty.to_string()),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    /// Account ids passed to `positions`.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PositionsClient for FakePositions {
    async fn positions(&self, account_id: &str) -> Result<Vec<Position>> {
        self.requested.lock().unwrap().push(account_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            bail!("FakePositions: backend returned 503");
        }
        Ok(self.positions.clone())
    }
}

#[derive(Default)]
pub struct FixedPersonalization(pub Option<Personalization>);

#[async_trait]
impl PersonalizationSource for FixedPersonalization {
    async fn personalization(&self, _user_id: Uuid) -> Result<Option<Personalization>> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// ScriptedLlm
// ---------------------------------------------------------------------------

pub struct ScriptedLlm {
    model: String,
    content: String,
    citations: Vec<String>,
    failing: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new(content: &str) -> Self {
        Self {
            model: "sonar-pro".to_string(),
            content: content.to_string(),
            citations: Vec::new(),
            failing: false,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answers with a well-formed `{"summary_text": ...}` object.
    pub fn summary(text: &str) -> Self {
        Self::new(&serde_json::json!({ "summary_text": text }).to_string())
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new("")
        }
    }

    pub fn with_citations(mut self, urls: &[&str]) -> Self {
        self.citations = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User message of every call, in order.
    pub fn user_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| m.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl ChatCompletionClient for ScriptedLlm {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> ai_client::Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(AiError::Api {
                status: 500,
                message: "ScriptedLlm: upstream error".to_string(),
            });
        }
        Ok(Completion {
            content: self.content.clone(),
            citations: self.citations.clone(),
            model: self.model.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// FakePreviewer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePreviewer {
    pages: HashMap<String, LinkPreview>,
    slow: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl FakePreviewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, title: &str, description: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            LinkPreview {
                url: url.to_string(),
                title: Some(title.to_string()),
                description: Some(description.to_string()),
                excerpt: None,
            },
        );
        self
    }

    pub fn with_slow_page(mut self, url: &str, delay: Duration) -> Self {
        self.slow.insert(url.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkPreviewer for FakePreviewer {
    async fn preview(&self, url: &str) -> Result<LinkPreview> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.slow.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("FakePreviewer: {url} unreachable"))
    }
}

// ---------------------------------------------------------------------------
// MemorySummaries
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySummaries {
    records: Mutex<Vec<UserSummaryRecord>>,
    failing_insert: AtomicBool,
}

impl MemorySummaries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: UserSummaryRecord) -> Self {
        self.records.lock().unwrap().push(record);
        self
    }

    pub fn set_failing_insert(&self, failing: bool) {
        self.failing_insert.store(failing, Ordering::SeqCst);
    }

    pub fn count(&self, user_id: Uuid) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl SummaryRepository for MemorySummaries {
    async fn latest(&self, user_id: Uuid) -> Result<Option<UserSummaryRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.generated_at)
            .cloned())
    }

    async fn insert(&self, record: &UserSummaryRecord) -> Result<()> {
        if self.failing_insert.load(Ordering::SeqCst) {
            bail!("MemorySummaries: insert rejected");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// A previous summary for `user_id` generated `hours_ago` hours ago.
pub fn record_for(user_id: Uuid, hours_ago: i64, text: &str) -> UserSummaryRecord {
    UserSummaryRecord {
        user_id,
        summary_text: text.to_string(),
        referenced_articles: Vec::new(),
        generated_at: chrono::Utc::now() - chrono::Duration::hours(hours_ago),
        model_identifier: "sonar-pro".to_string(),
    }
}
