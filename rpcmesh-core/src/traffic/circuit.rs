use crate::error::{MeshError, Result};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CircuitBreakerParams {
    /// Consecutive failures in the closed state before opening the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open before a probe is let through.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerParams {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Unsynchronized state machine; time is passed in so transitions are testable.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.last_failure
    }

    /// Returns whether a call may start at `now`.
    pub fn allow_request(&mut self, service: &str, p: &CircuitBreakerParams, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,

            CircuitState::Open => {
                let Some(last_failure) = self.last_failure else {
                    // Open always records a failure time; fail safe anyway.
                    return false;
                };

                if now.saturating_duration_since(last_failure) > p.cooldown {
                    self.state = CircuitState::HalfOpen;
                    self.consecutive_failures = 0;

                    info!(
                        event = "circuit_transition",
                        service,
                        from = ?CircuitState::Open,
                        to = ?self.state,
                        reason = "cooldown_expired"
                    );
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn on_request_end(
        &mut self,
        service: &str,
        p: &CircuitBreakerParams,
        success: bool,
        now: Instant,
    ) {
        match (self.state, success) {
            (CircuitState::Closed, true) => {
                self.consecutive_failures = 0;
            }

            (CircuitState::Closed, false) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.last_failure = Some(now);
                if self.consecutive_failures >= p.failure_threshold {
                    self.trip_open(service, now, "failure_threshold_exceeded");
                }
            }

            (CircuitState::HalfOpen, true) => self.reset_closed(service, "probe_succeeded"),

            (CircuitState::HalfOpen, false) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.trip_open(service, now, "half_open_failure");
            }

            // A call admitted just before another caller tripped the circuit.
            (CircuitState::Open, _) => {}
        }
    }

    /// Forces the closed state, e.g. from an operator command.
    pub fn reset(&mut self, service: &str) {
        if self.state != CircuitState::Closed || self.consecutive_failures != 0 {
            self.reset_closed(service, "manual_reset");
        }
    }

    fn trip_open(&mut self, service: &str, now: Instant, reason: &'static str) {
        let old_state = self.state;
        self.state = CircuitState::Open;
        self.last_failure = Some(now);

        warn!(
            event = "circuit_transition",
            service,
            from = ?old_state,
            to = ?self.state,
            reason,
            failures = self.consecutive_failures
        );
    }

    fn reset_closed(&mut self, service: &str, reason: &'static str) {
        let old_state = self.state;
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;

        info!(
            event = "circuit_transition",
            service,
            from = ?old_state,
            to = ?self.state,
            reason
        );
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Service-scoped failure gate around an async call.
///
/// Only outcomes for which [`MeshError::counts_as_breaker_failure`] holds move the
/// circuit; context errors and discovery errors pass through untouched.
#[derive(Debug)]
pub struct Breaker {
    service: String,
    params: CircuitBreakerParams,
    inner: Mutex<CircuitBreaker>,
}

impl Breaker {
    pub fn new(service: impl Into<String>, params: CircuitBreakerParams) -> Self {
        Self {
            service: service.into(),
            params,
            inner: Mutex::new(CircuitBreaker::new()),
        }
    }

    pub fn params(&self) -> &CircuitBreakerParams {
        &self.params
    }

    pub fn state(&self) -> CircuitState {
        self.with_inner(|cb| cb.state())
    }

    pub fn failure_count(&self) -> u32 {
        self.with_inner(|cb| cb.consecutive_failures())
    }

    pub fn reset(&self) {
        let service = self.service.as_str();
        self.with_inner(|cb| cb.reset(service));
    }

    /// Runs `f` unless the circuit is open, then feeds the outcome back.
    pub async fn call<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let service = self.service.as_str();

        let admitted = self.with_inner(|cb| cb.allow_request(service, &self.params, Instant::now()));
        if !admitted {
            return Err(MeshError::BreakerOpen {
                service: self.service.clone(),
            });
        }

        let outcome = f().await;

        let success = match &outcome {
            Ok(_) => Some(true),
            Err(err) if err.counts_as_breaker_failure() => Some(false),
            Err(_) => None,
        };

        if let Some(success) = success {
            self.with_inner(|cb| cb.on_request_end(service, &self.params, success, Instant::now()));
        }

        outcome
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut CircuitBreaker) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
