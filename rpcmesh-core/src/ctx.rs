use crate::error::{MeshError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Ambient context of a call: an optional deadline, a cancellation signal, and opaque
/// values that the transport forwards as request headers.
///
/// Cloning is cheap. Derived contexts never loosen their parent: a child deadline is the
/// earlier of the two, and canceling a parent cancels every child.
#[derive(Debug, Clone)]
pub struct CallCtx {
    deadline: Option<Instant>,
    token: CancellationToken,
    values: Arc<BTreeMap<String, String>>,
}

/// Cancels the [`CallCtx`] it was created with, and all contexts derived from it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Default for CallCtx {
    fn default() -> Self {
        Self::background()
    }
}

impl CallCtx {
    /// A context that never expires and is never canceled.
    pub fn background() -> Self {
        Self {
            deadline: None,
            token: CancellationToken::new(),
            values: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };

        Self {
            deadline: Some(deadline),
            token: self.token.clone(),
            values: self.values.clone(),
        }
    }

    /// Derives a child context plus the handle that cancels it.
    pub fn cancelable(&self) -> (Self, CancelHandle) {
        let token = self.token.child_token();
        let handle = CancelHandle {
            token: token.clone(),
        };

        (
            Self {
                deadline: self.deadline,
                token,
                values: self.values.clone(),
            },
            handle,
        )
    }

    /// Attaches an opaque value, e.g. `X-Request-Id` or `Authorization`.
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut values = (*self.values).clone();
        values.insert(key.into(), value.into());

        Self {
            deadline: self.deadline,
            token: self.token.clone(),
            values: Arc::new(values),
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Non-blocking check. Cancellation is reported ahead of an elapsed deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(MeshError::Canceled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(MeshError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context fires, yielding the matching error.
    pub async fn done(&self) -> MeshError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => MeshError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => MeshError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                MeshError::Canceled
            }
        }
    }

    /// Runs `fut` to completion unless the context fires first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            out = fut => out,
        }
    }

    /// Sleeps for `delay`, returning early with the context error if it fires.
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}
