use crate::error::{MeshError, Result};
use crate::registry::backend::{Discovery, RegistryBackend};
use crate::registry::types::{ServiceInfo, ServiceInstance};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::sync::Arc;

/// Process-wide registry adapter: publishes the local service and answers discovery
/// queries through a pluggable [`RegistryBackend`].
#[derive(Debug)]
pub struct Registry {
    backend: Arc<dyn RegistryBackend>,

    /// Id handed out by the last successful `register`.
    registered: ArcSwapOption<String>,
}

impl Registry {
    pub fn new(backend: Arc<dyn RegistryBackend>) -> Self {
        Self {
            backend,
            registered: ArcSwapOption::empty(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn RegistryBackend> {
        &self.backend
    }

    /// Registers `info`, assigning `name-address-port` when the id is blank.
    /// Returns the id the record was stored under.
    pub async fn register(&self, mut info: ServiceInfo) -> Result<String> {
        info.id = info.instance_id();

        self.backend.register(&info).await?;
        self.registered.store(Some(Arc::new(info.id.clone())));

        tracing::info!(
            service = %info.name,
            instance = %info.id,
            address = %info.address,
            port = info.port,
            "service registered"
        );

        Ok(info.id)
    }

    /// Removes the record created by [`register`](Self::register). No-op when nothing
    /// was registered, so it is safe to call unconditionally at shutdown.
    pub async fn deregister(&self) -> Result<()> {
        let Some(id) = self.registered.load_full() else {
            return Ok(());
        };

        self.backend.deregister(&id).await?;
        self.registered.store(None);

        tracing::info!(instance = %id, "service deregistered");
        Ok(())
    }

    pub fn registered_id(&self) -> Option<String> {
        self.registered.load_full().map(|id| id.as_ref().clone())
    }

    pub async fn list_healthy(&self, service: &str) -> Result<Vec<ServiceInstance>> {
        let instances = self.backend.list(service, true).await?;

        if instances.is_empty() {
            return Err(MeshError::NoInstances {
                service: service.to_string(),
            });
        }

        Ok(instances)
    }
}

#[async_trait]
impl Discovery for Registry {
    async fn list_healthy(&self, service: &str) -> Result<Vec<ServiceInstance>> {
        Registry::list_healthy(self, service).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::MemoryRegistry;
    use pretty_assertions::assert_eq;

    fn registry() -> (Arc<MemoryRegistry>, Registry) {
        let memory = Arc::new(MemoryRegistry::new());
        let registry = Registry::new(memory.clone());
        (memory, registry)
    }

    #[tokio::test]
    async fn register_assigns_default_id_and_remembers_it() {
        let (memory, registry) = registry();

        let id = registry
            .register(ServiceInfo::new("judge-api", "10.0.0.7", 8080))
            .await
            .unwrap();

        assert_eq!(id, "judge-api-10.0.0.7-8080");
        assert_eq!(registry.registered_id().as_deref(), Some(id.as_str()));
        assert!(memory.contains(&id));
    }

    #[tokio::test]
    async fn register_twice_with_same_id_replaces_record() {
        let (memory, registry) = registry();

        let info = ServiceInfo::new("judge-api", "10.0.0.7", 8080).with_id("judge-1");
        registry.register(info.clone()).await.unwrap();
        registry
            .register(info.with_tag("v2"))
            .await
            .unwrap();

        let listed = registry.list_healthy("judge-api").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tags, vec!["v2".to_string()]);
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn deregister_without_register_is_noop() {
        let (_, registry) = registry();
        registry.deregister().await.unwrap();
        assert_eq!(registry.registered_id(), None);
    }

    #[tokio::test]
    async fn deregister_removes_record() {
        let (memory, registry) = registry();
        let id = registry
            .register(ServiceInfo::new("judge-api", "10.0.0.7", 8080))
            .await
            .unwrap();

        registry.deregister().await.unwrap();

        assert!(!memory.contains(&id));
        assert_eq!(registry.registered_id(), None);
        // second call is a no-op
        registry.deregister().await.unwrap();
    }

    #[tokio::test]
    async fn empty_healthy_set_is_no_instances() {
        let (memory, registry) = registry();
        let id = registry
            .register(ServiceInfo::new("judge-api", "10.0.0.7", 8080))
            .await
            .unwrap();
        memory.set_passing(&id, false);

        let err = registry.list_healthy("judge-api").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoInstances);

        let err = registry.list_healthy("unknown").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoInstances);
    }
}
