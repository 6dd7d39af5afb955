use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::store::KvStore;

/// Remembers when a refresh last went out so a finished refresh isn't
/// immediately re-triggered by the next stale read.
///
/// Any store failure reads as "no marker" and never suppresses a refresh.
#[derive(Clone)]
pub struct RefreshThrottle {
    store: Arc<dyn KvStore>,
}

impl RefreshThrottle {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn should_skip(&self, key: &str, cooldown: Duration) -> bool {
        self.should_skip_at(key, cooldown, Utc::now()).await
    }

    pub async fn should_skip_at(&self, key: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        let last = match self.store.get(key).await {
            Ok(Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(ms) => ms,
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring unparseable refresh marker");
                    return false;
                }
            },
            Ok(None) => return false,
            Err(e) => {
                warn!(key, error = %e, "Refresh marker unreadable, not throttling");
                return false;
            }
        };

        let skip = within_cooldown(last, now.timestamp_millis(), cooldown);
        if skip {
            debug!(key, last_refresh_ms = last, "Refresh throttled");
        }
        skip
    }

    pub async fn mark_refreshed(&self, key: &str) {
        self.mark_refreshed_at(key, Utc::now()).await
    }

    pub async fn mark_refreshed_at(&self, key: &str, at: DateTime<Utc>) {
        let value = at.timestamp_millis().to_string();
        if let Err(e) = self.store.set(key, &value).await {
            warn!(key, error = %e, "Failed to record refresh marker");
        }
    }
}

fn within_cooldown(last_ms: i64, now_ms: i64, cooldown: Duration) -> bool {
    i128::from(now_ms) - i128::from(last_ms) < cooldown.as_millis() as i128
}
