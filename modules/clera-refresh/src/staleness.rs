use chrono::{DateTime, Utc};

use clera_common::CacheMetadata;

/// Past this many hours beyond `next_update` the scheduled job has clearly
/// failed and a read is allowed to force a refresh.
pub const EXTREME_STALENESS_HOURS: f64 = 24.0;

/// Why a shared cache is or isn't considered stale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Staleness {
    /// No metadata row, or a timestamp is null. Never generated.
    Missing,
    /// More than a day past schedule.
    ExtremelyStale { hours_past: f64 },
    /// Past schedule but within a day; left to the scheduled job.
    PastSchedule { hours_past: f64 },
    Fresh,
}

impl Staleness {
    pub fn needs_refresh(&self) -> bool {
        matches!(self, Staleness::Missing | Staleness::ExtremelyStale { .. })
    }
}

pub fn evaluate(metadata: Option<&CacheMetadata>, now: DateTime<Utc>) -> Staleness {
    let Some(meta) = metadata else {
        return Staleness::Missing;
    };
    let (Some(_), Some(next_update)) = (meta.last_updated, meta.next_update) else {
        return Staleness::Missing;
    };

    let hours_past = (now - next_update).num_milliseconds() as f64 / 3_600_000.0;
    if hours_past > EXTREME_STALENESS_HOURS {
        Staleness::ExtremelyStale { hours_past }
    } else if now > next_update {
        Staleness::PastSchedule { hours_past }
    } else {
        Staleness::Fresh
    }
}

/// Whether a read should kick off a refresh.
pub fn is_stale(metadata: Option<&CacheMetadata>, now: DateTime<Utc>) -> bool {
    evaluate(metadata, now).needs_refresh()
}
