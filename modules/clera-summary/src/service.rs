// Read path for per-user summaries.
//
// A fresh record is served without touching the lock. Otherwise whoever
// wins the per-user lock generates while the request waits; everyone else
// gets the previous record or "in progress". Generation and the release run
// in their own task, so a dropped request cannot leave the lock behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use clera_common::{summary_lock_key, UserSummaryRecord};
use clera_refresh::DistributedLock;

use crate::error::{Result, SummaryError};
use crate::generator::SummaryGenerator;
use crate::traits::SummaryRepository;

/// Summaries are daily.
pub const SUMMARY_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Long enough for a slow search-grounded completion plus enrichment.
pub const SUMMARY_LOCK_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryRead {
    Fresh(UserSummaryRecord),
    Generated(UserSummaryRecord),
    /// Previous record, served because generation is running elsewhere or
    /// just failed.
    Stale(UserSummaryRecord),
    InProgress,
}

impl SummaryRead {
    pub fn record(&self) -> Option<&UserSummaryRecord> {
        match self {
            SummaryRead::Fresh(r) | SummaryRead::Generated(r) | SummaryRead::Stale(r) => Some(r),
            SummaryRead::InProgress => None,
        }
    }
}

pub fn is_fresh(record: &UserSummaryRecord, now: DateTime<Utc>) -> bool {
    match (now - record.generated_at).to_std() {
        Ok(age) => age < SUMMARY_MAX_AGE,
        // generated_at ahead of our clock
        Err(_) => true,
    }
}

pub struct SummaryService {
    repository: Arc<dyn SummaryRepository>,
    generator: SummaryGenerator,
    lock: DistributedLock,
}

impl SummaryService {
    pub fn new(
        repository: Arc<dyn SummaryRepository>,
        generator: SummaryGenerator,
        lock: DistributedLock,
    ) -> Self {
        Self {
            repository,
            generator,
            lock,
        }
    }

    /// `force` skips the freshness check and never falls back to an old
    /// record on failure.
    pub async fn read(&self, user_id: Uuid, force: bool) -> Result<SummaryRead> {
        let latest = self
            .repository
            .latest(user_id)
            .await
            .map_err(SummaryError::Lookup)?;

        if !force {
            if let Some(record) = latest.as_ref().filter(|r| is_fresh(r, Utc::now())) {
                return Ok(SummaryRead::Fresh(record.clone()));
            }
        }

        let key = summary_lock_key(&user_id);
        if !self.lock.acquire(&key, SUMMARY_LOCK_TTL).await {
            info!(%user_id, force, "Summary generation already in progress");
            return Ok(match latest {
                Some(record) if !force => SummaryRead::Stale(record),
                _ => SummaryRead::InProgress,
            });
        }

        info!(
            %user_id,
            force,
            reason = if latest.is_some() { "expired" } else { "missing" },
            "Generating portfolio summary"
        );
        let generator = self.generator.clone();
        let lock = self.lock.clone();
        let task = tokio::spawn(async move {
            let result = generator.generate(user_id).await;
            lock.release(&key).await;
            result
        });
        let result = match task.await {
            Ok(result) => result,
            // panicked before releasing
            Err(e) => {
                self.lock.release(&summary_lock_key(&user_id)).await;
                Err(SummaryError::Task(e))
            }
        };

        match result {
            Ok(record) => Ok(SummaryRead::Generated(record)),
            Err(e) => match latest {
                Some(record) if !force => {
                    warn!(%user_id, error = %e, "Summary generation failed, serving previous record");
                    Ok(SummaryRead::Stale(record))
                }
                _ => Err(e),
            },
        }
    }
}
