// Key-value seam used by locks and throttle markers.
//
// Production talks to Upstash over REST. When no store is configured the
// UnconfiguredStore answers every call with an error, which the lock and
// throttle treat exactly like an outage.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use upstash_client::{UpstashClient, UpstashError};

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Upstash(#[from] UpstashError),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomic set-if-absent with expiry. True iff this call created the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError>;

    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Plain overwrite, no expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

#[async_trait]
impl KvStore for UpstashClient {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        // EX takes whole seconds; round up so short TTLs never become zero.
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        Ok(self.set_nx_ex(key, value, secs).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(UpstashClient::get(self, key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        Ok(UpstashClient::set(self, key, value).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.del(key).await?;
        Ok(())
    }
}

/// Stand-in when no store credentials are configured.
pub struct UnconfiguredStore;

#[async_trait]
impl KvStore for UnconfiguredStore {
    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool, KvError> {
        Err(KvError::Unavailable("not configured".to_string()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Err(KvError::Unavailable("not configured".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), KvError> {
        Err(KvError::Unavailable("not configured".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), KvError> {
        Err(KvError::Unavailable("not configured".to_string()))
    }
}
