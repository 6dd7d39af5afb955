// Test doubles for the refresh layer.
//
// - MemoryStore (KvStore): in-process map with TTLs, call counters and an
//   outage switch.
// - MockNewsStore (NewsCacheStore): fixed metadata and rows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;

use clera_common::{CacheMetadata, CachedArticle, NewsFeed};

use crate::news::NewsCacheStore;
use crate::store::{KvError, KvStore};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
    set_if_absent_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails like an unreachable store.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_if_absent_calls(&self) -> usize {
        self.set_if_absent_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|e| e.live(Instant::now()))
            .map(|e| e.value.clone())
    }

    fn check_online(&self) -> Result<(), KvError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        self.set_if_absent_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        if entries.get(key).is_some_and(|e| e.live(now)) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check_online()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.check_online()?;
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockNewsStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockNewsStore {
    metadata: HashMap<NewsFeed, CacheMetadata>,
    articles: HashMap<NewsFeed, Vec<CachedArticle>>,
    failing_metadata: bool,
}

impl MockNewsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, feed: NewsFeed, metadata: CacheMetadata) -> Self {
        self.metadata.insert(feed, metadata);
        self
    }

    pub fn with_articles(mut self, feed: NewsFeed, articles: Vec<CachedArticle>) -> Self {
        self.articles.insert(feed, articles);
        self
    }

    pub fn failing_metadata(mut self) -> Self {
        self.failing_metadata = true;
        self
    }
}

#[async_trait]
impl NewsCacheStore for MockNewsStore {
    async fn metadata(&self, feed: NewsFeed) -> Result<Option<CacheMetadata>> {
        if self.failing_metadata {
            bail!("MockNewsStore: metadata unavailable");
        }
        Ok(self.metadata.get(&feed).cloned())
    }

    async fn articles(&self, feed: NewsFeed, category: Option<&str>) -> Result<Vec<CachedArticle>> {
        let rows = self.articles.get(&feed).cloned().unwrap_or_default();
        Ok(match category {
            Some(c) => rows
                .into_iter()
                .filter(|a| a.category.as_deref() == Some(c))
                .collect(),
            None => rows,
        })
    }
}

/// A minimal cached row.
pub fn article(title: &str, category: Option<&str>) -> CachedArticle {
    CachedArticle {
        title: title.to_string(),
        url: format!("https://news.example/{}", title.to_lowercase().replace(' ', "-")),
        snippet: None,
        source: Some("news.example".to_string()),
        published_at: None,
        image_url: None,
        sentiment_score: None,
        category: category.map(String::from),
    }
}
