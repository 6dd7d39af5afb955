pub mod lock;
pub mod news;
pub mod staleness;
pub mod store;
pub mod throttle;
pub mod trigger;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use lock::DistributedLock;
pub use news::{NewsCache, NewsCacheStore, NewsSnapshot};
pub use staleness::{evaluate, is_stale, Staleness};
pub use store::{KvError, KvStore, UnconfiguredStore};
pub use throttle::RefreshThrottle;
pub use trigger::{RefreshEndpoint, RefreshTrigger, TriggerOutcome};
