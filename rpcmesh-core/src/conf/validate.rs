use crate::conf::MeshConfig;
use crate::error::{MeshError, Result};
use crate::net::parse_host_port;

impl MeshConfig {
    /// Checks every constraint and reports all violations in one error.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if let Err(e) = parse_host_port(&self.registry_address) {
            problems.push(format!("registry_address: {e}"));
        }
        if self.default_timeout_ms == 0 {
            problems.push("default_timeout_ms must be greater than zero".to_string());
        }

        //---------------------------------------------------------------------
        // Resilience
        //---------------------------------------------------------------------
        if self.retry.max_attempts < 1 {
            problems.push("retry.max_attempts must be at least 1".to_string());
        }
        if !self.retry.backoff_factor.is_finite() || self.retry.backoff_factor < 1.0 {
            problems.push(format!(
                "retry.backoff_factor must be >= 1.0 (got {})",
                self.retry.backoff_factor
            ));
        }
        if self.breaker.failure_threshold < 1 {
            problems.push("breaker.failure_threshold must be at least 1".to_string());
        }

        //---------------------------------------------------------------------
        // Published service
        //---------------------------------------------------------------------
        if let Some(service) = &self.service {
            if service.name.trim().is_empty() {
                problems.push("service.name must not be empty".to_string());
            }
            if service.address.trim().is_empty() {
                problems.push("service.address must not be empty".to_string());
            }
            if service.port == 0 {
                problems.push("service.port must be greater than zero".to_string());
            }
            if service.report_interval_ms == 0 {
                problems.push("service.report_interval_ms must be greater than zero".to_string());
            }
            if let Some(check) = &service.health_check {
                if !check.http.starts_with("http://") && !check.http.starts_with("https://") {
                    problems.push(format!(
                        "service.health_check.http must be an http(s) URL (got '{}')",
                        check.http
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MeshError::config(problems.join("; ")))
        }
    }
}
