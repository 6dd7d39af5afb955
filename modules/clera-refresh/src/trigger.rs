use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use clera_common::NewsFeed;

use crate::lock::DistributedLock;
use crate::store::KvStore;
use crate::throttle::RefreshThrottle;

/// Only the request that starts the job is awaited, never the job itself.
const TRIGGER_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the privileged regeneration endpoints live and how to call them.
#[derive(Debug, Clone)]
pub struct RefreshEndpoint {
    pub base_url: String,
    pub cron_secret: String,
}

impl RefreshEndpoint {
    pub fn new(base_url: impl Into<String>, cron_secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cron_secret: cron_secret.into(),
        }
    }

    pub fn url_for(&self, feed: NewsFeed) -> String {
        format!("{}{}", self.base_url, feed.cron_path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A refresh went out within the cooldown window.
    Throttled,
    /// Another worker holds the refresh lock.
    LockHeld,
    /// The job endpoint accepted the call.
    Dispatched { status: u16 },
    /// The job endpoint answered with a non-success status.
    Rejected { status: u16 },
    /// The call never got a response.
    Failed(String),
}

/// Starts a feed's regeneration job at most once per cooldown across the fleet.
pub struct RefreshTrigger {
    feed: NewsFeed,
    lock: DistributedLock,
    throttle: RefreshThrottle,
    http: reqwest::Client,
    endpoint: RefreshEndpoint,
}

impl RefreshTrigger {
    pub fn new(
        feed: NewsFeed,
        store: Arc<dyn KvStore>,
        http: reqwest::Client,
        endpoint: RefreshEndpoint,
    ) -> Self {
        Self {
            feed,
            lock: DistributedLock::new(store.clone()),
            throttle: RefreshThrottle::new(store),
            http,
            endpoint,
        }
    }

    pub fn feed(&self) -> NewsFeed {
        self.feed
    }

    pub async fn trigger_refresh(&self) -> TriggerOutcome {
        let lock_key = self.feed.lock_key();
        let throttle_key = self.feed.throttle_key();

        if self.throttle.should_skip(&throttle_key, self.feed.cooldown()).await {
            debug!(feed = %self.feed, "Refresh skipped, within cooldown");
            return TriggerOutcome::Throttled;
        }

        if !self.lock.acquire(&lock_key, self.feed.lock_ttl()).await {
            info!(feed = %self.feed, "Refresh already in progress elsewhere");
            return TriggerOutcome::LockHeld;
        }

        // Marked before the call so overlapping reads are suppressed too.
        self.throttle.mark_refreshed(&throttle_key).await;

        let outcome = self.dispatch().await;

        self.lock.release(&lock_key).await;
        outcome
    }

    /// Detached: the caller's response never waits on this.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<TriggerOutcome> {
        let trigger = Arc::clone(self);
        tokio::spawn(async move { trigger.trigger_refresh().await })
    }

    async fn dispatch(&self) -> TriggerOutcome {
        let url = self.endpoint.url_for(self.feed);

        let result = self
            .http
            .get(&url)
            .bearer_auth(&self.endpoint.cron_secret)
            .timeout(TRIGGER_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status().as_u16();
                info!(feed = %self.feed, status, "Background refresh triggered");
                TriggerOutcome::Dispatched { status }
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                warn!(feed = %self.feed, status, url = %url, "Refresh endpoint rejected trigger");
                TriggerOutcome::Rejected { status }
            }
            Err(e) => {
                warn!(feed = %self.feed, error = %e, url = %url, "Failed to trigger refresh");
                TriggerOutcome::Failed(e.to_string())
            }
        }
    }
}
