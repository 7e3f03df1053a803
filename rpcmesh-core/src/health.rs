use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Periodically evaluates a liveness predicate and logs healthy/unhealthy transitions.
///
/// The reporter never touches the registry; the registry's own HTTP probe is the
/// authoritative signal. [`HealthHandle::is_healthy`] exposes the last observation
/// for a local `/health` handler to serve.
pub struct HealthReporter;

/// Owns the background task. Dropping it signals stop.
#[derive(Debug)]
pub struct HealthHandle {
    stop_tx: watch::Sender<bool>,
    healthy: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl HealthReporter {
    /// Spawns the reporter on the current tokio runtime. The first tick fires
    /// immediately; the state starts out healthy.
    pub fn start<F>(name: impl Into<String>, interval: Duration, healthy: F) -> HealthHandle
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        let (stop_tx, stop_rx) = watch::channel(false);
        let state = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(run(name, interval, healthy, state.clone(), stop_rx));

        HealthHandle {
            stop_tx,
            healthy: state,
            task: Some(task),
        }
    }
}

async fn run<F>(
    name: String,
    interval: Duration,
    healthy: F,
    state: Arc<AtomicBool>,
    mut stop_rx: watch::Receiver<bool>,
) where
    F: Fn() -> bool + Send + Sync + 'static,
{
    // Dropped on every return path below.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tracing::debug!(service = %name, ?interval, "health reporter started");

    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let now = healthy();
                let before = state.swap(now, Ordering::SeqCst);
                if before != now {
                    if now {
                        tracing::info!(service = %name, "health check recovered");
                    } else {
                        tracing::warn!(service = %name, "health check failing");
                    }
                }
            }
        }
    }

    tracing::debug!(service = %name, "health reporter stopped");
}

impl HealthHandle {
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Signals stop and waits for the task to exit (at most one tick).
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "health reporter task ended abnormally");
            }
        }
    }
}

impl Drop for HealthHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
