use crate::conf::{MeshConfig, ServiceSpec};
use crate::error::ErrorKind;

fn service() -> ServiceSpec {
    ServiceSpec {
        name: "judge-api".into(),
        id: None,
        address: "10.0.0.7".into(),
        port: 8080,
        tags: vec![],
        meta: Default::default(),
        report_interval_ms: 10_000,
        health_check: None,
    }
}

#[test]
fn defaults_are_valid() {
    assert!(MeshConfig::default().validate().is_ok());
}

#[test]
fn ipv6_registry_address_uses_last_colon() {
    let cfg = MeshConfig {
        registry_address: "[::1]:8500".into(),
        ..MeshConfig::default()
    };
    assert!(cfg.validate().is_ok());
}

#[test]
fn every_violation_is_reported() {
    let mut cfg = MeshConfig {
        registry_address: "consul".into(),
        default_timeout_ms: 0,
        ..MeshConfig::default()
    };
    cfg.retry.max_attempts = 0;
    cfg.retry.backoff_factor = 0.5;
    cfg.breaker.failure_threshold = 0;

    let err = cfg.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let msg = err.to_string();
    for needle in [
        "registry_address",
        "default_timeout_ms",
        "retry.max_attempts",
        "retry.backoff_factor",
        "breaker.failure_threshold",
    ] {
        assert!(msg.contains(needle), "missing '{needle}' in: {msg}");
    }
}

#[test]
fn service_port_must_be_set() {
    let cfg = MeshConfig {
        service: Some(ServiceSpec {
            port: 0,
            ..service()
        }),
        ..MeshConfig::default()
    };

    assert!(cfg.validate().unwrap_err().to_string().contains("service.port"));
}

#[test]
fn toml_rejecting_values_surface_through_parse() {
    let err = "[retry]\nbackoff_factor = 0.9\n"
        .parse::<MeshConfig>()
        .unwrap_err();
    assert!(err.to_string().contains("retry.backoff_factor"));
}

#[test]
fn valid_service_passes() {
    let cfg = MeshConfig {
        service: Some(service()),
        ..MeshConfig::default()
    };
    assert!(cfg.validate().is_ok());
}
