use crate::error::Result;
use crate::registry::types::{ServiceInfo, ServiceInstance};
use async_trait::async_trait;

/// Wire contract of a service registry. Implementations are replaceable bindings
/// (Consul agent over HTTP, in-memory catalog, ...).
#[async_trait]
pub trait RegistryBackend: Send + Sync + std::fmt::Debug {
    /// Stores `info` under `info.id`, which callers have already filled in.
    /// A record with the same id is replaced.
    async fn register(&self, info: &ServiceInfo) -> Result<()>;

    async fn deregister(&self, id: &str) -> Result<()>;

    async fn list(&self, service: &str, passing_only: bool) -> Result<Vec<ServiceInstance>>;
}

/// The one capability the resolver needs from discovery.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Passing instances only. An empty healthy set is reported as
    /// [`MeshError::NoInstances`](crate::error::MeshError::NoInstances), never as `Ok(vec![])`.
    async fn list_healthy(&self, service: &str) -> Result<Vec<ServiceInstance>>;
}
