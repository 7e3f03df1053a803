use crate::ctx::CallCtx;
use crate::error::{MeshError, Result};
use std::time::Duration;

/// Immutable retry budget: `max_attempts` calls, sleeping `initial_delay`,
/// `initial_delay * factor`, `initial_delay * factor^2`, ... in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64) -> Result<Self> {
        if max_attempts < 1 {
            return Err(MeshError::config("retry.max_attempts must be at least 1"));
        }
        if !backoff_factor.is_finite() || backoff_factor < 1.0 {
            return Err(MeshError::config("retry.backoff_factor must be >= 1.0"));
        }

        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_factor,
        })
    }

    /// One attempt, no sleeping.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Delay slept after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        scale(self.initial_delay, self.backoff_factor.powi(exp))
    }

    /// Sum of every sleep when all attempts fail.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.delay_after(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

fn scale(d: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(d.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `f` until it succeeds or the budget is spent, retrying every error.
    ///
    /// `f` receives the 1-based attempt number. Context errors end the loop at once,
    /// whether `f` returned one or the context fired during a backoff sleep.
    pub async fn run<F, Fut, T>(&self, ctx: &CallCtx, f: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_if(ctx, f, |_| true).await
    }

    /// Like [`run`](Self::run), but stops at the first error `should_retry` rejects.
    pub async fn run_if<F, Fut, T, P>(&self, ctx: &CallCtx, mut f: F, should_retry: P) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&MeshError) -> bool,
    {
        ctx.check()?;

        let mut delay = self.config.initial_delay;
        let mut attempt = 1;

        loop {
            let err = match f(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if err.is_context_error()
                || attempt >= self.config.max_attempts
                || !should_retry(&err)
            {
                return Err(err);
            }

            tracing::debug!(
                attempt,
                max_attempts = self.config.max_attempts,
                ?delay,
                error = %err,
                "attempt failed, backing off"
            );

            ctx.sleep(delay).await?;

            delay = scale(delay, self.config.backoff_factor);
            attempt += 1;
        }
    }
}
