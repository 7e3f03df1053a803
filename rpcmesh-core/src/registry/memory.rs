use crate::error::Result;
use crate::registry::backend::RegistryBackend;
use crate::registry::types::{ServiceInfo, ServiceInstance};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct MemoryRecord {
    info: ServiceInfo,
    passing: bool,
}

/// In-process registry catalog. Every record starts out passing; flip it with
/// [`set_passing`](Self::set_passing) to simulate the registry's own probe.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: DashMap<String, MemoryRecord>,
    list_calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `id` is unknown.
    pub fn set_passing(&self, id: &str, passing: bool) -> bool {
        match self.records.get_mut(id) {
            Some(mut record) => {
                record.passing = passing;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of `list` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    async fn register(&self, info: &ServiceInfo) -> Result<()> {
        self.records.insert(
            info.id.clone(),
            MemoryRecord {
                info: info.clone(),
                passing: true,
            },
        );
        Ok(())
    }

    async fn deregister(&self, id: &str) -> Result<()> {
        self.records.remove(id);
        Ok(())
    }

    async fn list(&self, service: &str, passing_only: bool) -> Result<Vec<ServiceInstance>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let mut instances: Vec<ServiceInstance> = self
            .records
            .iter()
            .filter(|r| r.info.name == service && (r.passing || !passing_only))
            .map(|r| ServiceInstance::from(&r.info))
            .collect();

        instances.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(instances)
    }
}
