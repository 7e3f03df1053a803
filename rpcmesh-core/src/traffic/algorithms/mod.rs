mod random;
mod round_robin;

pub use random::*;
pub use round_robin::*;

use crate::traffic::strategy::TrafficStrategy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalancingStrategy {
    #[default]
    RoundRobin,
    Random,
}

impl LoadBalancingStrategy {
    /// Fresh strategy state; each service gets its own.
    pub fn build(self) -> Arc<dyn TrafficStrategy> {
        match self {
            LoadBalancingStrategy::RoundRobin => Arc::new(RoundRobin::new()),
            LoadBalancingStrategy::Random => Arc::new(Random::default()),
        }
    }
}
