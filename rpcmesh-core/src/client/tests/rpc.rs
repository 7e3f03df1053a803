use super::resolver_with;
use crate::client::{ClientOptions, RpcClient};
use crate::ctx::CallCtx;
use crate::error::ErrorKind;
use crate::traffic::{CircuitBreakerParams, CircuitState, RetryConfig};
use std::time::Duration;

fn closed_port_options(threshold: u32) -> ClientOptions {
    ClientOptions::default()
        .with_retry(RetryConfig::no_retry())
        .with_breaker(CircuitBreakerParams {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(30),
        })
}

#[tokio::test(start_paused = true)]
async fn no_instances_never_touches_breaker() {
    let (memory, resolver) = resolver_with("judge-api", &[]).await;
    let client = RpcClient::new("judge-api", resolver, ClientOptions::default()).unwrap();

    for _ in 0..10 {
        let err = client
            .get::<serde_json::Value>(&CallCtx::background(), "/health")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoInstances);
    }

    assert_eq!(client.breaker().state(), CircuitState::Closed);
    assert_eq!(client.breaker().failure_count(), 0);
    // Empty answers are never cached: every attempt of every call asked the registry.
    assert_eq!(memory.list_calls(), 30);
}

#[tokio::test]
async fn transient_only_stops_on_discovery_error() {
    let (memory, resolver) = resolver_with("judge-api", &[]).await;
    let options = ClientOptions::default().retry_only_transient(true);
    let client = RpcClient::new("judge-api", resolver, options).unwrap();

    let err = client
        .get::<serde_json::Value>(&CallCtx::background(), "/health")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NoInstances);
    assert_eq!(memory.list_calls(), 1);
}

#[tokio::test]
async fn transport_failures_open_the_circuit() {
    let (_, resolver) = resolver_with("judge-api", &[("127.0.0.1", 9)]).await;
    let client = RpcClient::new("judge-api", resolver, closed_port_options(2)).unwrap();
    let ctx = CallCtx::background();

    for _ in 0..2 {
        let err = client.get::<serde_json::Value>(&ctx, "/health").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }
    assert_eq!(client.breaker().state(), CircuitState::Open);

    let err = client.get::<serde_json::Value>(&ctx, "/health").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BreakerOpen);
    assert!(err.to_string().contains("judge-api"));
}

#[tokio::test]
async fn canceled_call_is_not_a_failure() {
    let (_, resolver) = resolver_with("judge-api", &[("127.0.0.1", 9)]).await;
    let client = RpcClient::new("judge-api", resolver, closed_port_options(1)).unwrap();
    let (ctx, handle) = CallCtx::background().cancelable();
    handle.cancel();

    let err = client
        .post::<_, serde_json::Value>(&ctx, "/api/v1/judge", &serde_json::json!({"id": 1}))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Canceled);
    assert_eq!(client.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn manual_reset_closes_circuit() {
    let (_, resolver) = resolver_with("judge-api", &[("127.0.0.1", 9)]).await;
    let client = RpcClient::new("judge-api", resolver, closed_port_options(1)).unwrap();

    let _ = client
        .delete::<serde_json::Value>(&CallCtx::background(), "/api/v1/judge/1")
        .await;
    assert_eq!(client.breaker().state(), CircuitState::Open);

    client.breaker().reset();
    assert_eq!(client.breaker().state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn malformed_header_fails_before_dispatch() {
    let (memory, resolver) = resolver_with("judge-api", &[("127.0.0.1", 9)]).await;
    let options = ClientOptions::default().with_breaker(CircuitBreakerParams {
        failure_threshold: 1,
        cooldown: Duration::from_secs(30),
    });
    let client = RpcClient::new("judge-api", resolver, options).unwrap();
    let ctx = CallCtx::background().with_value("Bad Header", "x");

    let err = client
        .get::<serde_json::Value>(&ctx, "/health")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    assert!(err.to_string().contains("Bad Header"));
    // Neither resolved, retried nor counted.
    assert_eq!(memory.list_calls(), 0);
    assert_eq!(client.breaker().state(), CircuitState::Closed);
    assert_eq!(client.breaker().failure_count(), 0);
}
