use crate::error::{ErrorKind, MeshError, Result};
use crate::traffic::circuit::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

const SVC: &str = "judge-api";

fn params() -> CircuitBreakerParams {
    CircuitBreakerParams {
        failure_threshold: 3,
        cooldown: Duration::from_millis(100),
    }
}

fn trip(cb: &mut CircuitBreaker, p: &CircuitBreakerParams, now: Instant) {
    for _ in 0..p.failure_threshold {
        assert!(cb.allow_request(SVC, p, now));
        cb.on_request_end(SVC, p, false, now);
    }
}

fn transport_like_failure() -> MeshError {
    MeshError::Remote {
        service: SVC.into(),
        method: http::Method::GET,
        url: "http://10.0.0.7:8080/x".into(),
        status: 503,
        body: String::new(),
    }
}

#[test]
fn test_cb_trip_open() {
    let mut cb = CircuitBreaker::new();
    let p = params();
    let now = Instant::now();

    assert_eq!(cb.state(), CircuitState::Closed);
    assert!(cb.allow_request(SVC, &p, now));

    // 1 failure
    cb.on_request_end(SVC, &p, false, now);
    assert_eq!(cb.state(), CircuitState::Closed);

    // 2 failures
    cb.on_request_end(SVC, &p, false, now);
    assert_eq!(cb.state(), CircuitState::Closed);

    // 3 failures -> Open
    cb.on_request_end(SVC, &p, false, now);
    assert_eq!(cb.state(), CircuitState::Open);
    assert_eq!(cb.last_failure(), Some(now));
    assert!(!cb.allow_request(SVC, &p, now));
}

#[test]
fn test_cb_success_resets_count() {
    let mut cb = CircuitBreaker::new();
    let p = params();
    let now = Instant::now();

    cb.on_request_end(SVC, &p, false, now);
    cb.on_request_end(SVC, &p, false, now);
    cb.on_request_end(SVC, &p, true, now);
    assert_eq!(cb.consecutive_failures(), 0);

    cb.on_request_end(SVC, &p, false, now);
    cb.on_request_end(SVC, &p, false, now);
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[test]
fn test_cb_cooldown_boundary() {
    let mut cb = CircuitBreaker::new();
    let p = params();
    let t0 = Instant::now();
    trip(&mut cb, &p, t0);

    // Exactly at the cooldown it is still open.
    assert!(!cb.allow_request(SVC, &p, t0 + p.cooldown));
    assert_eq!(cb.state(), CircuitState::Open);

    // Past it, the call is admitted as a half-open probe with a fresh count.
    assert!(cb.allow_request(SVC, &p, t0 + p.cooldown + Duration::from_millis(1)));
    assert_eq!(cb.state(), CircuitState::HalfOpen);
    assert_eq!(cb.consecutive_failures(), 0);
}

#[test]
fn test_cb_half_open_to_closed() {
    let mut cb = CircuitBreaker::new();
    let p = params();
    let t0 = Instant::now();
    trip(&mut cb, &p, t0);

    let later = t0 + Duration::from_millis(150);
    assert!(cb.allow_request(SVC, &p, later));
    cb.on_request_end(SVC, &p, true, later);

    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.consecutive_failures(), 0);

    // One more failure does not reopen it.
    cb.on_request_end(SVC, &p, false, later);
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[test]
fn test_cb_half_open_failure_reopens() {
    let mut cb = CircuitBreaker::new();
    let p = params();
    let t0 = Instant::now();
    trip(&mut cb, &p, t0);

    let later = t0 + Duration::from_millis(150);
    assert!(cb.allow_request(SVC, &p, later));
    cb.on_request_end(SVC, &p, false, later);

    assert_eq!(cb.state(), CircuitState::Open);
    assert_eq!(cb.last_failure(), Some(later));
    assert!(!cb.allow_request(SVC, &p, later + Duration::from_millis(50)));
}

#[test]
fn test_cb_manual_reset() {
    let mut cb = CircuitBreaker::new();
    let p = params();
    trip(&mut cb, &p, Instant::now());

    cb.reset(SVC);
    assert_eq!(cb.state(), CircuitState::Closed);
    assert_eq!(cb.consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn breaker_rejects_without_invoking_when_open() {
    let breaker = Breaker::new(SVC, params());
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let out: Result<()> = breaker
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transport_like_failure())
            })
            .await;
        assert_eq!(out.unwrap_err().kind(), ErrorKind::Remote);
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let out: Result<()> = breaker
        .call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert_eq!(out.unwrap_err().kind(), ErrorKind::BreakerOpen);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn breaker_recovers_after_cooldown() {
    let breaker = Breaker::new(SVC, params());

    for _ in 0..3 {
        let _: Result<()> = breaker.call(|| async { Err(transport_like_failure()) }).await;
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(101)).await;

    let out: Result<u8> = breaker.call(|| async { Ok(7) }).await;
    assert_eq!(out.unwrap(), 7);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test]
async fn context_and_discovery_errors_are_not_counted() {
    let breaker = Breaker::new(SVC, params());

    for _ in 0..10 {
        let _: Result<()> = breaker.call(|| async { Err(MeshError::DeadlineExceeded) }).await;
        let _: Result<()> = breaker.call(|| async { Err(MeshError::Canceled) }).await;
        let _: Result<()> = breaker
            .call(|| async {
                Err(MeshError::NoInstances {
                    service: SVC.into(),
                })
            })
            .await;
    }

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}
