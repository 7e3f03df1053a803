mod rpc;

use crate::discovery::ServiceResolver;
use crate::registry::{MemoryRegistry, Registry, ServiceInfo};
use std::sync::Arc;

/// Memory-backed resolver with `instances` of `service` registered as passing.
pub(super) async fn resolver_with(
    service: &str,
    instances: &[(&str, u16)],
) -> (Arc<MemoryRegistry>, Arc<ServiceResolver>) {
    let memory = Arc::new(MemoryRegistry::new());
    let registry = Registry::new(memory.clone());

    for (address, port) in instances {
        registry
            .register(ServiceInfo::new(service, *address, *port))
            .await
            .unwrap();
    }

    let resolver = ServiceResolver::new(Arc::new(registry));
    (memory, Arc::new(resolver))
}
