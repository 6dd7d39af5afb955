use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::store::KvStore;

/// Fleet-wide mutual exclusion on top of `SET NX EX`.
///
/// Fails open: if the store cannot be reached, `acquire` reports success.
/// The TTL bounds how long a crashed holder can block others.
#[derive(Clone)]
pub struct DistributedLock {
    store: Arc<dyn KvStore>,
}

impl DistributedLock {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// True if the caller may proceed as the holder of `key`.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> bool {
        let token = Utc::now().timestamp_millis().to_string();
        match self.store.set_if_absent(key, &token, ttl).await {
            Ok(true) => {
                debug!(key, ttl_secs = ttl.as_secs(), "Lock acquired");
                true
            }
            Ok(false) => {
                debug!(key, "Lock held by another worker");
                false
            }
            Err(e) => {
                warn!(
                    key,
                    error = %e,
                    alert = "lock_store_unreachable",
                    "Lock store unreachable, proceeding without lock"
                );
                true
            }
        }
    }

    /// Errors are logged only; the TTL reclaims the key regardless.
    pub async fn release(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = %e, "Failed to release lock, leaving it to expire");
        }
    }
}
