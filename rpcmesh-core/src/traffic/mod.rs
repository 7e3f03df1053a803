pub mod algorithms;
pub mod circuit;
mod retry;
mod strategy;

#[cfg(test)]
mod tests;

pub use algorithms::LoadBalancingStrategy;
pub use circuit::{Breaker, CircuitBreaker, CircuitBreakerParams, CircuitState};
pub use retry::*;
pub use strategy::*;
