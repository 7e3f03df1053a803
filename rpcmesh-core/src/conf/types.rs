use crate::client::ClientOptions;
use crate::error::Result;
use crate::registry::{HealthCheck, ServiceInfo};
use crate::traffic::{CircuitBreakerParams, LoadBalancingStrategy, RetryConfig};
use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything `rpcmesh` reads from its TOML file. Durations are integer milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MeshConfig {
    /// Registry agent as `host:port`.
    #[serde(default = "default_registry_address")]
    pub registry_address: String,

    /// Sent as `X-Consul-Token` when present.
    #[serde(default)]
    pub registry_token: Option<String>,

    /// Bound on one HTTP exchange.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    #[serde(default)]
    pub load_balancing: LoadBalancingStrategy,

    #[serde(default)]
    pub breaker: BreakerSpec,

    #[serde(default)]
    pub retry: RetrySpec,

    #[serde(default)]
    pub transport: TransportSpec,

    /// What `rpcmesh register` publishes.
    #[serde(default)]
    pub service: Option<ServiceSpec>,
}

fn default_registry_address() -> String {
    "127.0.0.1:8500".to_string()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_cache_ttl_ms() -> u64 {
    30_000
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            registry_address: default_registry_address(),
            registry_token: None,
            default_timeout_ms: default_timeout_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            load_balancing: LoadBalancingStrategy::default(),
            breaker: BreakerSpec::default(),
            retry: RetrySpec::default(),
            transport: TransportSpec::default(),
            service: None,
        }
    }
}

impl MeshConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            max_idle_connections: self.transport.max_idle_connections,
            max_idle_per_host: self.transport.max_idle_per_host,
            idle_timeout: Duration::from_millis(self.transport.idle_timeout_ms),
            request_timeout: self.default_timeout(),
        }
    }

    pub fn client_options(&self) -> Result<ClientOptions> {
        Ok(ClientOptions::default()
            .with_transport(self.transport_config())
            .with_retry(self.retry.to_retry_config()?)
            .with_breaker(self.breaker.to_params())
            .retry_only_transient(self.retry.only_transient))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BreakerSpec {
    /// Consecutive failed calls before the circuit opens.
    #[serde(default = "cb_default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long to keep the circuit open before allowing a probe.
    #[serde(default = "cb_default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn cb_default_failure_threshold() -> u32 {
    5
}
fn cb_default_cooldown_ms() -> u64 {
    30_000
}

impl Default for BreakerSpec {
    fn default() -> Self {
        Self {
            failure_threshold: cb_default_failure_threshold(),
            cooldown_ms: cb_default_cooldown_ms(),
        }
    }
}

impl BreakerSpec {
    pub fn to_params(&self) -> CircuitBreakerParams {
        CircuitBreakerParams {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_millis(self.cooldown_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RetrySpec {
    #[serde(default = "retry_default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "retry_default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "retry_default_backoff_factor")]
    pub backoff_factor: f64,

    /// Retry only transport failures, 5xx and 429.
    #[serde(default)]
    pub only_transient: bool,
}

fn retry_default_max_attempts() -> u32 {
    3
}
fn retry_default_initial_delay_ms() -> u64 {
    100
}
fn retry_default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self {
            max_attempts: retry_default_max_attempts(),
            initial_delay_ms: retry_default_initial_delay_ms(),
            backoff_factor: retry_default_backoff_factor(),
            only_transient: false,
        }
    }
}

impl RetrySpec {
    pub fn to_retry_config(&self) -> Result<RetryConfig> {
        RetryConfig::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            self.backoff_factor,
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TransportSpec {
    #[serde(default = "tr_default_max_idle_connections")]
    pub max_idle_connections: usize,

    #[serde(default = "tr_default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    #[serde(default = "tr_default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

fn tr_default_max_idle_connections() -> usize {
    100
}
fn tr_default_max_idle_per_host() -> usize {
    10
}
fn tr_default_idle_timeout_ms() -> u64 {
    90_000
}

impl Default for TransportSpec {
    fn default() -> Self {
        Self {
            max_idle_connections: tr_default_max_idle_connections(),
            max_idle_per_host: tr_default_max_idle_per_host(),
            idle_timeout_ms: tr_default_idle_timeout_ms(),
        }
    }
}

/// The local service as published to the registry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceSpec {
    pub name: String,

    /// Defaults to `name-address-port`.
    #[serde(default)]
    pub id: Option<String>,

    pub address: String,
    pub port: u16,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub meta: BTreeMap<String, String>,

    /// Period of the local health reporter.
    #[serde(default = "svc_default_report_interval_ms")]
    pub report_interval_ms: u64,

    #[serde(default)]
    pub health_check: Option<HealthCheckSpec>,
}

fn svc_default_report_interval_ms() -> u64 {
    10_000
}

impl ServiceSpec {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    pub fn to_service_info(&self) -> ServiceInfo {
        ServiceInfo {
            name: self.name.clone(),
            id: self.id.clone().unwrap_or_default(),
            address: self.address.clone(),
            port: self.port,
            tags: self.tags.clone(),
            meta: self.meta.clone(),
            health_check: self.health_check.as_ref().map(HealthCheckSpec::to_health_check),
        }
    }
}

/// HTTP probe the registry runs against the service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HealthCheckSpec {
    pub http: String,

    #[serde(default = "hc_default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "hc_default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "hc_default_deregister_after_ms")]
    pub deregister_after_ms: u64,
}

fn hc_default_interval_ms() -> u64 {
    10_000
}
fn hc_default_timeout_ms() -> u64 {
    5_000
}
fn hc_default_deregister_after_ms() -> u64 {
    60_000
}

impl HealthCheckSpec {
    pub fn to_health_check(&self) -> HealthCheck {
        HealthCheck {
            http: self.http.clone(),
            interval: Duration::from_millis(self.interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            deregister_after: Duration::from_millis(self.deregister_after_ms),
        }
    }
}
