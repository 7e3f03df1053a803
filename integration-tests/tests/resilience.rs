use integration_tests::harness::{FakeConsul, Reply, Upstream};
use pretty_assertions::assert_eq;
use rpcmesh_core::traffic::CircuitState;
use rpcmesh_core::{CallCtx, ClientPool, ErrorKind, MeshConfig};
use serde_json::json;
use std::time::{Duration, Instant};

mod common;

fn failing_service(cfg_edit: impl FnOnce(&mut MeshConfig)) -> (Upstream, FakeConsul, ClientPool) {
    let upstream = Upstream::start(Reply::Hangup);
    let consul = FakeConsul::start();
    consul.add_instance("judge-api", "127.0.0.1", upstream.port());

    let mut cfg = common::mesh_config(&consul);
    cfg_edit(&mut cfg);
    let pool = common::pool(&cfg);
    (upstream, consul, pool)
}

#[tokio::test]
async fn breaker_trips_then_recovers() {
    let (upstream, _consul, pool) = failing_service(|cfg| {
        cfg.breaker.failure_threshold = 5;
        cfg.breaker.cooldown_ms = 500;
        cfg.retry.max_attempts = 2;
    });
    let client = pool.get("judge-api").unwrap();
    let ctx = CallCtx::background();

    // Five failed calls, each spending its whole retry budget.
    for _ in 0..5 {
        let err = client.get::<serde_json::Value>(&ctx, "/ping").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
    assert_eq!(upstream.hits(), 10);
    assert_eq!(client.breaker().state(), CircuitState::Open);

    // Rejected without touching the network.
    let err = client.get::<serde_json::Value>(&ctx, "/ping").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BreakerOpen);
    assert_eq!(upstream.hits(), 10);

    // After the cooldown a single success closes the circuit.
    tokio::time::sleep(Duration::from_millis(600)).await;
    upstream.set_reply(Reply::ok(json!({"pong": true})));
    let _: serde_json::Value = client.get(&ctx, "/ping").await.unwrap();
    assert_eq!(client.breaker().state(), CircuitState::Closed);
    assert_eq!(client.breaker().failure_count(), 0);

    // The count restarted from zero, so one more failure keeps it closed.
    upstream.set_reply(Reply::Hangup);
    let _ = client.get::<serde_json::Value>(&ctx, "/ping").await;
    assert_eq!(client.breaker().state(), CircuitState::Closed);
    assert_eq!(client.breaker().failure_count(), 1);
}

#[tokio::test]
async fn deadline_during_backoff_ends_call() {
    let (upstream, _consul, pool) = failing_service(|cfg| {
        cfg.retry.max_attempts = 3;
        cfg.retry.initial_delay_ms = 500;
        cfg.retry.backoff_factor = 2.0;
    });
    let client = pool.get("judge-api").unwrap();
    let ctx = CallCtx::background().with_timeout(Duration::from_millis(400));
    let started = Instant::now();

    let err = client
        .get::<serde_json::Value>(&ctx, "/ping")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    assert_eq!(upstream.hits(), 1);
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(client.breaker().failure_count(), 0);
}

#[tokio::test]
async fn cancel_during_backoff_returns_promptly() {
    let (upstream, _consul, pool) = failing_service(|cfg| {
        cfg.retry.initial_delay_ms = 5_000;
    });
    let client = pool.get("judge-api").unwrap();
    let (ctx, handle) = CallCtx::background().cancelable();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.cancel();
    });

    let started = Instant::now();
    let err = client
        .get::<serde_json::Value>(&ctx, "/ping")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Canceled);
    assert_eq!(upstream.hits(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn slow_upstream_hits_request_timeout() {
    let upstream = Upstream::start(Reply::Delayed(
        Duration::from_millis(800),
        Box::new(Reply::ok(json!({}))),
    ));
    let consul = FakeConsul::start();
    consul.add_instance("judge-api", "127.0.0.1", upstream.port());
    let mut cfg = common::mesh_config(&consul);
    cfg.default_timeout_ms = 100;
    cfg.retry.max_attempts = 2;
    let pool = common::pool(&cfg);
    let client = pool.get("judge-api").unwrap();

    let err = client
        .get::<serde_json::Value>(&CallCtx::background(), "/slow")
        .await
        .unwrap_err();

    // A per-exchange timeout is a transport failure and was retried.
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(upstream.hits(), 2);
}
