//! Consul agent binding of [`RegistryBackend`].

use crate::error::{MeshError, Result, body_snippet};
use crate::net;
use crate::registry::backend::RegistryBackend;
use crate::registry::types::{ServiceInfo, ServiceInstance, duration_text};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ConsulBackend {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

//-----------------------------------------------------------------------------
// Wire types
//-----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    id: &'a str,
    name: &'a str,
    tags: &'a [String],
    address: &'a str,
    port: u16,
    meta: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    check: Option<AgentServiceCheck>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AgentServiceCheck {
    #[serde(rename = "HTTP")]
    http: String,
    interval: String,
    timeout: String,
    deregister_critical_service_after: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthServiceEntry {
    #[serde(default)]
    node: Option<NodeEntry>,
    service: AgentService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeEntry {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AgentService {
    #[serde(rename = "ID")]
    id: String,
    service: String,
    #[serde(default)]
    address: String,
    port: u16,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    meta: Option<BTreeMap<String, String>>,
}

impl From<HealthServiceEntry> for ServiceInstance {
    fn from(entry: HealthServiceEntry) -> Self {
        let svc = entry.service;

        // Consul leaves the service address blank when it equals the node address.
        let address = if svc.address.is_empty() {
            entry.node.map(|n| n.address).unwrap_or_default()
        } else {
            svc.address
        };

        ServiceInstance {
            id: svc.id,
            service: svc.service,
            address,
            port: svc.port,
            tags: svc.tags.unwrap_or_default(),
            meta: svc.meta.unwrap_or_default(),
        }
    }
}

//-----------------------------------------------------------------------------
// Client
//-----------------------------------------------------------------------------

impl ConsulBackend {
    /// `address` is the agent's `host:port`.
    pub fn new(address: &str) -> Result<Self> {
        net::parse_host_port(address)?;

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MeshError::registry_io("connect", e))?;

        Ok(Self {
            http,
            base_url: format!("http://{address}"),
            token: None,
        })
    }

    /// ACL token sent as `X-Consul-Token`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/v1/<segments>` under the agent, each segment percent-encoded.
    fn url(&self, op: &'static str, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| MeshError::registry(op, format!("bad agent url: {e}")))?;

        url.path_segments_mut()
            .map_err(|()| MeshError::registry(op, "agent url cannot carry a path"))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);

        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.token {
            req = req.header("X-Consul-Token", token);
        }
        req
    }

    async fn send(
        &self,
        op: &'static str,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let response = req
            .send()
            .await
            .map_err(|e| MeshError::registry_io(op, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MeshError::registry(
                op,
                format!("HTTP {}: {}", status.as_u16(), body_snippet(&body)),
            ));
        }

        Ok(response)
    }
}

fn registration(info: &ServiceInfo) -> AgentServiceRegistration<'_> {
    AgentServiceRegistration {
        id: &info.id,
        name: &info.name,
        tags: &info.tags,
        address: &info.address,
        port: info.port,
        meta: &info.meta,
        check: info.health_check.as_ref().map(|hc| AgentServiceCheck {
            http: hc.http.clone(),
            interval: duration_text(hc.interval),
            timeout: duration_text(hc.timeout),
            deregister_critical_service_after: duration_text(hc.deregister_after),
        }),
    }
}

#[async_trait]
impl RegistryBackend for ConsulBackend {
    async fn register(&self, info: &ServiceInfo) -> Result<()> {
        let url = self.url("register", &["agent", "service", "register"])?;
        let req = self
            .request(reqwest::Method::PUT, url)
            .json(&registration(info));

        self.send("register", req).await?;
        Ok(())
    }

    async fn deregister(&self, id: &str) -> Result<()> {
        let url = self.url("deregister", &["agent", "service", "deregister", id])?;
        let req = self.request(reqwest::Method::PUT, url);

        self.send("deregister", req).await?;
        Ok(())
    }

    async fn list(&self, service: &str, passing_only: bool) -> Result<Vec<ServiceInstance>> {
        let url = self.url("list", &["health", "service", service])?;
        let mut req = self.request(reqwest::Method::GET, url);
        if passing_only {
            req = req.query(&[("passing", "true")]);
        }

        let entries: Vec<HealthServiceEntry> = self
            .send("list", req)
            .await?
            .json()
            .await
            .map_err(|e| MeshError::registry_io("list", e))?;

        tracing::debug!(service, count = entries.len(), "registry listed instances");

        Ok(entries.into_iter().map(ServiceInstance::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HealthCheck;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn registration_payload_uses_agent_field_names() {
        let info = ServiceInfo::new("judge-api", "10.0.0.7", 8080)
            .with_id("judge-api-10.0.0.7-8080")
            .with_tag("v1")
            .with_meta("zone", "a")
            .with_health_check(HealthCheck {
                http: "http://10.0.0.7:8080/health".into(),
                interval: Duration::from_secs(10),
                timeout: Duration::from_secs(5),
                deregister_after: Duration::from_secs(60),
            });

        let payload = serde_json::to_value(registration(&info)).unwrap();

        assert_eq!(
            payload,
            json!({
                "ID": "judge-api-10.0.0.7-8080",
                "Name": "judge-api",
                "Tags": ["v1"],
                "Address": "10.0.0.7",
                "Port": 8080,
                "Meta": {"zone": "a"},
                "Check": {
                    "HTTP": "http://10.0.0.7:8080/health",
                    "Interval": "10s",
                    "Timeout": "5s",
                    "DeregisterCriticalServiceAfter": "1m"
                }
            })
        );
    }

    #[test]
    fn registration_without_check_omits_it() {
        let info = ServiceInfo::new("judge-api", "10.0.0.7", 8080).with_id("x");
        let payload = serde_json::to_value(registration(&info)).unwrap();
        assert!(payload.get("Check").is_none());
    }

    #[test]
    fn health_entries_fall_back_to_node_address() {
        let raw = json!([
            {
                "Node": {"Address": "10.0.0.1"},
                "Service": {"ID": "a", "Service": "svc", "Address": "", "Port": 80, "Tags": null}
            },
            {
                "Node": {"Address": "10.0.0.2"},
                "Service": {"ID": "b", "Service": "svc", "Address": "10.0.0.9", "Port": 81,
                            "Tags": ["x"], "Meta": {"k": "v"}}
            }
        ]);

        let entries: Vec<HealthServiceEntry> = serde_json::from_value(raw).unwrap();
        let instances: Vec<ServiceInstance> =
            entries.into_iter().map(ServiceInstance::from).collect();

        assert_eq!(instances[0].endpoint(), "10.0.0.1:80");
        assert!(instances[0].tags.is_empty());
        assert_eq!(instances[1].endpoint(), "10.0.0.9:81");
        assert_eq!(instances[1].meta.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn rejects_malformed_agent_address() {
        assert!(ConsulBackend::new("no-port").is_err());
        let backend = ConsulBackend::new("127.0.0.1:8500").unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:8500");
    }

    #[test]
    fn names_are_escaped_as_single_path_segments() {
        let backend = ConsulBackend::new("127.0.0.1:8500").unwrap();

        let url = backend
            .url("list", &["health", "service", "judge/api?x#y"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8500/v1/health/service/judge%2Fapi%3Fx%23y"
        );

        let url = backend
            .url("deregister", &["agent", "service", "deregister", "judge-api-10.0.0.7-8080"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8500/v1/agent/service/deregister/judge-api-10.0.0.7-8080"
        );
    }
}
