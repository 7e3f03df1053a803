use crate::registry::ServiceInstance;
use crate::traffic::strategy::TrafficStrategy;
use std::sync::atomic::{AtomicUsize, Ordering};

/// `healthy[counter % len]`, counter bumped after each pick. The atomic add wraps at
/// `usize::MAX`, which only skews the sequence once per wrap.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }

    #[cfg(test)]
    pub(crate) fn starting_at(counter: usize) -> Self {
        Self {
            counter: AtomicUsize::new(counter),
        }
    }
}

impl TrafficStrategy for RoundRobin {
    fn select<'a>(&self, healthy: &'a [ServiceInstance]) -> Option<&'a ServiceInstance> {
        if healthy.is_empty() {
            return None;
        }

        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % healthy.len();
        healthy.get(idx)
    }
}
