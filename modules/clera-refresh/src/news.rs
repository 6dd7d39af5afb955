// Read path for the shared news caches: always answer from what's stored,
// and when the metadata says so, kick off a detached refresh.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use clera_common::{CacheMetadata, CachedArticle, NewsFeed};

use crate::staleness::{self, Staleness};
use crate::trigger::{RefreshTrigger, TriggerOutcome};

#[async_trait]
pub trait NewsCacheStore: Send + Sync {
    async fn metadata(&self, feed: NewsFeed) -> Result<Option<CacheMetadata>>;

    /// Cached rows, newest first, optionally narrowed to one category.
    async fn articles(&self, feed: NewsFeed, category: Option<&str>) -> Result<Vec<CachedArticle>>;
}

pub struct NewsSnapshot {
    pub feed: NewsFeed,
    pub articles: Vec<CachedArticle>,
    pub last_updated: Option<DateTime<Utc>>,
    pub next_update: Option<DateTime<Utc>>,
    pub staleness: Staleness,
    /// Present when this read started a refresh. Dropping it detaches the task.
    pub refresh: Option<JoinHandle<TriggerOutcome>>,
}

impl NewsSnapshot {
    pub fn to_response(&self) -> serde_json::Value {
        serde_json::json!({
            "articles": self.articles,
            "last_updated": self.last_updated,
            "next_update": self.next_update,
        })
    }
}

pub struct NewsCache {
    feed: NewsFeed,
    store: Arc<dyn NewsCacheStore>,
    trigger: Arc<RefreshTrigger>,
}

impl NewsCache {
    pub fn new(store: Arc<dyn NewsCacheStore>, trigger: Arc<RefreshTrigger>) -> Self {
        Self {
            feed: trigger.feed(),
            store,
            trigger,
        }
    }

    pub fn feed(&self) -> NewsFeed {
        self.feed
    }

    pub async fn read(&self, category: Option<&str>) -> Result<NewsSnapshot> {
        let now = Utc::now();

        // An unreadable metadata row is not the same as a missing one: serve
        // what we have and leave refreshing to the scheduled job.
        let (metadata, staleness) = match self.store.metadata(self.feed).await {
            Ok(metadata) => {
                let staleness = staleness::evaluate(metadata.as_ref(), now);
                (metadata, staleness)
            }
            Err(e) => {
                warn!(feed = %self.feed, error = %e, "Failed to read cache metadata");
                (None, Staleness::Fresh)
            }
        };

        let refresh = if staleness.needs_refresh() {
            info!(feed = %self.feed, verdict = ?staleness, "Cache stale, triggering background refresh");
            Some(self.trigger.spawn())
        } else {
            None
        };

        let articles = self.store.articles(self.feed, category).await?;

        Ok(NewsSnapshot {
            feed: self.feed,
            articles,
            last_updated: metadata.as_ref().and_then(|m| m.last_updated),
            next_update: metadata.as_ref().and_then(|m| m.next_update),
            staleness,
            refresh,
        })
    }
}
