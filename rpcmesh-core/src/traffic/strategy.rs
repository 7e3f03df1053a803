use crate::registry::ServiceInstance;

/// Picks one instance out of a healthy set. `None` only for an empty set; callers turn
/// that into `NoInstances`.
pub trait TrafficStrategy: Send + Sync + std::fmt::Debug {
    fn select<'a>(&self, healthy: &'a [ServiceInstance]) -> Option<&'a ServiceInstance>;
}
