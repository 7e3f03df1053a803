use crate::registry::ServiceInstance;
use crate::traffic::strategy::TrafficStrategy;
use rand::{Rng, rng};

#[derive(Debug, Default)]
pub struct Random {}

impl TrafficStrategy for Random {
    fn select<'a>(&self, healthy: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        if healthy.is_empty() {
            return None;
        }

        let idx = rng().random_range(0..healthy.len());
        healthy.get(idx)
    }
}
