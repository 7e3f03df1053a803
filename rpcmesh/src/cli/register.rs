use crate::cli::load;
use anyhow::Context;
use rpcmesh_core::health::HealthReporter;
use rpcmesh_core::registry::{ConsulBackend, Registry};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

pub async fn register(path: &Path) -> anyhow::Result<()> {
    let cfg = load(path)?;
    let spec = cfg
        .service
        .clone()
        .context("no [service] section in config")?;

    let mut backend = ConsulBackend::new(&cfg.registry_address)?;
    if let Some(token) = &cfg.registry_token {
        backend = backend.with_token(token.clone());
    }
    let registry = Registry::new(Arc::new(backend));

    let id = registry.register(spec.to_service_info()).await?;
    tracing::info!(service = %spec.name, id = %id, "service published; press Ctrl-C to withdraw");

    let target = format!("{}:{}", spec.address, spec.port);
    let reachable = Arc::new(AtomicBool::new(true));
    let checker = spawn_reachability_check(target, spec.report_interval(), reachable.clone());

    let reporter = HealthReporter::start(&spec.name, spec.report_interval(), move || {
        reachable.load(Ordering::SeqCst)
    });

    let waited = tokio::signal::ctrl_c().await;
    tracing::info!(service = %spec.name, "shutting down");

    reporter.stop().await;
    checker.abort();
    let deregistered = registry.deregister().await;

    waited.context("failed to listen for Ctrl-C")?;
    deregistered?;
    tracing::info!(service = %spec.name, id = %id, "service withdrawn");
    Ok(())
}

/// Keeps `reachable` current with a non-blocking TCP connect to `target` every `every`.
fn spawn_reachability_check(
    target: String,
    every: Duration,
    reachable: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            reachable.store(accepts_connections(&target).await, Ordering::SeqCst);
        }
    })
}

async fn accepts_connections(target: &str) -> bool {
    matches!(
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}
