use crate::client::{ClientOptions, RpcClient};
use crate::conf::MeshConfig;
use crate::discovery::ServiceResolver;
use crate::error::Result;
use crate::registry::{ConsulBackend, Discovery, Registry};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Service name to [`RpcClient`], created on first use.
///
/// All clients share one resolver, and therefore one instance cache, but each owns its
/// transport and breaker so trips stay scoped to one service.
#[derive(Debug)]
pub struct ClientPool {
    options: ClientOptions,
    resolver: Arc<ServiceResolver>,
    clients: DashMap<String, Arc<RpcClient>>,
}

impl ClientPool {
    pub fn new(options: ClientOptions, resolver: Arc<ServiceResolver>) -> Self {
        Self {
            options,
            resolver,
            clients: DashMap::new(),
        }
    }

    /// Builds the resolver from `cfg` on top of any discovery source.
    pub fn from_config(cfg: &MeshConfig, discovery: Arc<dyn Discovery>) -> Result<Self> {
        let resolver = ServiceResolver::new(discovery)
            .with_ttl(cfg.cache_ttl())
            .with_strategy(cfg.load_balancing);

        Ok(Self::new(cfg.client_options()?, Arc::new(resolver)))
    }

    /// Pool backed by the Consul agent at `cfg.registry_address`.
    pub fn connect(cfg: &MeshConfig) -> Result<Self> {
        let mut backend = ConsulBackend::new(&cfg.registry_address)?;
        if let Some(token) = &cfg.registry_token {
            backend = backend.with_token(token.clone());
        }

        let registry = Registry::new(Arc::new(backend));
        Self::from_config(cfg, Arc::new(registry))
    }

    pub fn get(&self, service: &str) -> Result<Arc<RpcClient>> {
        if let Some(client) = self.clients.get(service) {
            return Ok(client.value().clone());
        }

        match self.clients.entry(service.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let client = Arc::new(RpcClient::new(
                    service,
                    self.resolver.clone(),
                    self.options.clone(),
                )?);
                entry.insert(client.clone());

                tracing::debug!(service, "created rpc client");
                Ok(client)
            }
        }
    }

    pub fn remove(&self, service: &str) -> Option<Arc<RpcClient>> {
        let removed = self.clients.remove(service).map(|(_, client)| client);
        if removed.is_some() {
            tracing::debug!(service, "evicted rpc client");
        }
        removed
    }

    /// Drops every client. Calls already holding an `Arc<RpcClient>` finish normally.
    pub fn close(&self) {
        self.clients.clear();
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Names with a live client, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn resolver(&self) -> &Arc<ServiceResolver> {
        &self.resolver
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}
