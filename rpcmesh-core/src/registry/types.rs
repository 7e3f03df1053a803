use crate::net;
use std::collections::BTreeMap;
use std::time::Duration;

/// How the registry probes a registered instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    /// e.g. "http://10.0.0.7:8080/health"
    pub http: String,
    pub interval: Duration,
    pub timeout: Duration,
    /// The registry drops the record after it stays critical this long.
    pub deregister_after: Duration,
}

impl HealthCheck {
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            http: url.into(),
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            deregister_after: Duration::from_secs(60),
        }
    }
}

/// Identity a process publishes to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub name: String,
    /// Blank means `name-address-port`.
    pub id: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: BTreeMap<String, String>,
    pub health_check: Option<HealthCheck>,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            address: address.into(),
            port,
            tags: Vec::new(),
            meta: BTreeMap::new(),
            health_check: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = Some(check);
        self
    }

    pub fn default_id(&self) -> String {
        format!("{}-{}-{}", self.name, self.address, self.port)
    }

    /// The id this record is registered under.
    pub fn instance_id(&self) -> String {
        if self.id.trim().is_empty() {
            self.default_id()
        } else {
            self.id.clone()
        }
    }
}

/// One live endpoint of a named service, as returned by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub id: String,
    pub service: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: BTreeMap<String, String>,
}

impl ServiceInstance {
    pub fn new(service: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        let service = service.into();
        let address = address.into();
        Self {
            id: format!("{service}-{address}-{port}"),
            service,
            address,
            port,
            tags: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    /// `address:port`
    pub fn endpoint(&self) -> String {
        net::endpoint(&self.address, self.port)
    }
}

impl From<&ServiceInfo> for ServiceInstance {
    fn from(info: &ServiceInfo) -> Self {
        Self {
            id: info.instance_id(),
            service: info.name.clone(),
            address: info.address.clone(),
            port: info.port,
            tags: info.tags.clone(),
            meta: info.meta.clone(),
        }
    }
}

/// Renders a duration the way registries expect it on the wire: `"10s"`, `"500ms"`, `"1m"`.
pub fn duration_text(d: Duration) -> String {
    let ms = d.as_millis();
    if ms == 0 {
        return "0s".to_string();
    }
    if ms % 1000 != 0 {
        return format!("{ms}ms");
    }

    let secs = ms / 1000;
    if secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
