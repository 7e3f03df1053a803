use crate::harness::http::{RecordedRequest, Reply, serve};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Catalog {
    /// Registration payloads by service id.
    services: BTreeMap<String, Value>,
    critical: Vec<String>,
    list_calls: BTreeMap<String, usize>,
    requests: Vec<RecordedRequest>,
    fail_with: Option<u16>,
}

/// In-process stand-in for a Consul agent's service and health endpoints.
#[derive(Clone)]
pub struct FakeConsul {
    addr: SocketAddr,
    catalog: Arc<Mutex<Catalog>>,
}

impl FakeConsul {
    pub fn start() -> Self {
        let catalog: Arc<Mutex<Catalog>> = Arc::default();
        let state = catalog.clone();
        let addr = serve(Arc::new(move |req: &RecordedRequest| {
            let mut catalog = state.lock().unwrap();
            catalog.requests.push(req.clone());
            route(&mut catalog, req)
        }));

        Self { addr, catalog }
    }

    /// `host:port` for `MeshConfig::registry_address`.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Seeds a passing instance as if it had registered itself.
    pub fn add_instance(&self, service: &str, address: &str, port: u16) -> String {
        let id = format!("{service}-{address}-{port}");
        let payload = json!({
            "ID": &id, "Name": service, "Address": address, "Port": port,
            "Tags": [], "Meta": {}
        });
        self.catalog.lock().unwrap().services.insert(id.clone(), payload);
        id
    }

    pub fn set_critical(&self, id: &str, critical: bool) {
        let mut catalog = self.catalog.lock().unwrap();
        catalog.critical.retain(|c| c != id);
        if critical {
            catalog.critical.push(id.to_string());
        }
    }

    /// Every subsequent request answers with `status` until cleared with `None`.
    pub fn fail_with(&self, status: Option<u16>) {
        self.catalog.lock().unwrap().fail_with = status;
    }

    pub fn registration(&self, id: &str) -> Option<Value> {
        self.catalog.lock().unwrap().services.get(id).cloned()
    }

    pub fn list_calls(&self, service: &str) -> usize {
        let catalog = self.catalog.lock().unwrap();
        catalog.list_calls.get(service).copied().unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.catalog.lock().unwrap().requests.clone()
    }
}

fn route(catalog: &mut Catalog, req: &RecordedRequest) -> Reply {
    if let Some(status) = catalog.fail_with {
        return Reply::status(status, "agent unavailable");
    }

    let path = req.path();
    match req.method.as_str() {
        "PUT" if path == "/v1/agent/service/register" => {
            let payload = req.json();
            let id = payload["ID"].as_str().unwrap_or_default().to_string();
            catalog.services.insert(id, payload);
            Reply::status(200, "")
        }
        "PUT" if path.starts_with("/v1/agent/service/deregister/") => {
            let id = path.trim_start_matches("/v1/agent/service/deregister/");
            catalog.services.remove(id);
            Reply::status(200, "")
        }
        "GET" if path.starts_with("/v1/health/service/") => {
            let name = path.trim_start_matches("/v1/health/service/").to_string();
            *catalog.list_calls.entry(name.clone()).or_default() += 1;

            let passing_only = req.target.contains("passing=true");
            let entries: Vec<Value> = catalog
                .services
                .iter()
                .filter(|(_, svc)| svc["Name"] == name.as_str())
                .filter(|(id, _)| !passing_only || !catalog.critical.contains(*id))
                .map(|(_, svc)| health_entry(svc))
                .collect();

            Reply::ok(Value::Array(entries))
        }
        _ => Reply::status(404, "unknown endpoint"),
    }
}

fn health_entry(svc: &Value) -> Value {
    json!({
        "Node": {"Node": "test-node", "Address": "127.0.0.1"},
        "Service": {
            "ID": svc["ID"],
            "Service": svc["Name"],
            "Address": svc["Address"],
            "Port": svc["Port"],
            "Tags": svc["Tags"],
            "Meta": svc["Meta"],
        },
        "Checks": []
    })
}
