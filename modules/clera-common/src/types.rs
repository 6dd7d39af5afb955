use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Shared news caches ---

/// The two fleet-wide news caches refreshed by scheduled jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsFeed {
    Trending,
    Watchlist,
}

impl NewsFeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsFeed::Trending => "trending",
            NewsFeed::Watchlist => "watchlist",
        }
    }

    /// Key-value namespace shared by the lock and the throttle marker.
    pub fn namespace(&self) -> &'static str {
        match self {
            NewsFeed::Trending => "news:trending",
            NewsFeed::Watchlist => "news:watchlist",
        }
    }

    pub fn lock_key(&self) -> String {
        format!("{}:refresh:lock", self.namespace())
    }

    pub fn throttle_key(&self) -> String {
        format!("{}:last_refresh", self.namespace())
    }

    /// Privileged regeneration endpoint on this application.
    pub fn cron_path(&self) -> &'static str {
        match self {
            NewsFeed::Trending => "/api/cron/update-trending-news",
            NewsFeed::Watchlist => "/api/cron/update-watchlist-news",
        }
    }

    pub fn metadata_table(&self) -> &'static str {
        match self {
            NewsFeed::Trending => "trending_news_metadata",
            NewsFeed::Watchlist => "watchlist_news_metadata",
        }
    }

    pub fn articles_table(&self) -> &'static str {
        match self {
            NewsFeed::Trending => "cached_trending_news",
            NewsFeed::Watchlist => "watchlist_cached_news",
        }
    }

    /// Covers the regeneration job plus margin; expires if the holder dies.
    pub fn lock_ttl(&self) -> Duration {
        match self {
            NewsFeed::Trending => Duration::from_secs(10 * 60),
            NewsFeed::Watchlist => Duration::from_secs(5 * 60),
        }
    }

    /// Minimum gap between two refresh triggers.
    pub fn cooldown(&self) -> Duration {
        match self {
            NewsFeed::Trending => Duration::from_secs(10 * 60),
            NewsFeed::Watchlist => Duration::from_secs(5 * 60),
        }
    }
}

impl std::fmt::Display for NewsFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Singleton row written by a feed's regeneration job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub id: i64,
    pub last_updated: Option<DateTime<Utc>>,
    pub next_update: Option<DateTime<Utc>>,
}

/// One cached article row as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedArticle {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub sentiment_score: Option<f64>,
    pub category: Option<String>,
}

// --- Portfolio summaries ---

/// A citation resolved to something displayable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedArticle {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub source: String,
    #[serde(rename = "sentimentScore")]
    pub sentiment_score: f64,
    #[serde(rename = "shouldDisplay")]
    pub should_display: bool,
    #[serde(default)]
    pub used_for_paragraph: Option<u32>,
}

/// One generated summary. Rows are never updated; the newest one wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummaryRecord {
    pub user_id: Uuid,
    pub summary_text: String,
    pub referenced_articles: Vec<EnrichedArticle>,
    pub generated_at: DateTime<Utc>,
    pub model_identifier: String,
}

impl UserSummaryRecord {
    /// Response body shape expected by the web client.
    pub fn to_response(&self) -> serde_json::Value {
        serde_json::json!({
            "summary_text": self.summary_text,
            "referenced_articles": self.referenced_articles,
            "generated_at": self.generated_at,
            "perplexity_model": self.model_identifier,
        })
    }
}

pub fn summary_lock_key(user_id: &Uuid) -> String {
    format!("news:portfolio:summary:lock:{user_id}")
}
