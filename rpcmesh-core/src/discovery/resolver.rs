use crate::discovery::cache::{DEFAULT_CACHE_TTL, InstanceCacheEntry};
use crate::error::{MeshError, Result};
use crate::registry::{Discovery, ServiceInstance};
use crate::traffic::{LoadBalancingStrategy, TrafficStrategy};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

enum Balancing {
    /// One strategy state per service name, built on first use.
    PerService {
        strategy: LoadBalancingStrategy,
        states: DashMap<String, Arc<dyn TrafficStrategy>>,
    },
    /// A caller-supplied strategy shared by every service.
    Shared(Arc<dyn TrafficStrategy>),
}

/// Maps a logical service name to one live instance.
///
/// Healthy instance lists are cached per service for `ttl`, measured from the moment the
/// registry answered. Expired entries count as absent, failed refreshes are surfaced as-is
/// (the old list is never served), and empty answers are never cached.
pub struct ServiceResolver {
    discovery: Arc<dyn Discovery>,
    ttl: Duration,
    cache: DashMap<String, Arc<InstanceCacheEntry>>,
    balancing: Balancing,
}

impl std::fmt::Debug for ServiceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceResolver")
            .field("ttl", &self.ttl)
            .field("cached_services", &self.cache.len())
            .finish()
    }
}

impl ServiceResolver {
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self {
            discovery,
            ttl: DEFAULT_CACHE_TTL,
            cache: DashMap::new(),
            balancing: Balancing::PerService {
                strategy: LoadBalancingStrategy::default(),
                states: DashMap::new(),
            },
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_strategy(mut self, strategy: LoadBalancingStrategy) -> Self {
        self.balancing = Balancing::PerService {
            strategy,
            states: DashMap::new(),
        };
        self
    }

    pub fn with_balancer(mut self, balancer: Arc<dyn TrafficStrategy>) -> Self {
        self.balancing = Balancing::Shared(balancer);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Picks one instance of `service`.
    pub async fn resolve(&self, service: &str) -> Result<ServiceInstance> {
        let instances = self.instances(service).await?;

        self.balancer_for(service)
            .select(&instances)
            .cloned()
            .ok_or_else(|| MeshError::NoInstances {
                service: service.to_string(),
            })
    }

    /// The healthy set, from cache when fresh, otherwise straight from discovery.
    pub async fn instances(&self, service: &str) -> Result<Arc<[ServiceInstance]>> {
        let cached = self.cache.get(service).map(|e| e.value().clone());
        if let Some(entry) = cached {
            if entry.is_fresh(self.ttl, Instant::now()) {
                return Ok(entry.instances.clone());
            }
        }

        let fetched = self.discovery.list_healthy(service).await?;
        if fetched.is_empty() {
            return Err(MeshError::NoInstances {
                service: service.to_string(),
            });
        }

        let entry = Arc::new(InstanceCacheEntry::new(fetched, Instant::now()));
        tracing::debug!(
            service,
            count = entry.instances.len(),
            "instance cache refreshed"
        );

        let instances = entry.instances.clone();
        self.cache.insert(service.to_string(), entry);
        Ok(instances)
    }

    /// Current cache entry for `service`, fresh or not.
    pub fn cached(&self, service: &str) -> Option<Arc<InstanceCacheEntry>> {
        self.cache.get(service).map(|e| e.value().clone())
    }

    pub fn invalidate(&self, service: &str) {
        self.cache.remove(service);
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    fn balancer_for(&self, service: &str) -> Arc<dyn TrafficStrategy> {
        match &self.balancing {
            Balancing::Shared(balancer) => balancer.clone(),
            Balancing::PerService { strategy, states } => {
                if let Some(state) = states.get(service) {
                    return state.value().clone();
                }
                states
                    .entry(service.to_string())
                    .or_insert_with(|| strategy.build())
                    .value()
                    .clone()
            }
        }
    }
}
