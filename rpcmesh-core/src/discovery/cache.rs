use crate::registry::ServiceInstance;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Immutable snapshot of one service's healthy instances.
///
/// Entries are swapped wholesale; nobody mutates one in place.
#[derive(Debug, Clone)]
pub struct InstanceCacheEntry {
    pub instances: Arc<[ServiceInstance]>,
    pub fetched_at: Instant,
}

impl InstanceCacheEntry {
    pub fn new(instances: Vec<ServiceInstance>, fetched_at: Instant) -> Self {
        Self {
            instances: instances.into(),
            fetched_at,
        }
    }

    /// Valid iff `now - fetched_at <= ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) <= ttl
    }
}
