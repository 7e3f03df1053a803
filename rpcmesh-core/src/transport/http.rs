use crate::ctx::CallCtx;
use crate::error::{MeshError, Result, body_snippet};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const USER_AGENT: &str = "rpc-client/1.0.0";
pub const SERVICE_NAME_HEADER: &str = "X-Service-Name";

const JSON: &str = "application/json";

/// Connection pool and timeout limits of one [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Upper bound on idle connections kept by one transport. Every transport talks to a
    /// single service, so it caps the per-host limit.
    pub max_idle_connections: usize,
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    /// Bound on a single HTTP exchange, connect through last body byte.
    pub request_timeout: Duration,
}

impl TransportConfig {
    /// Idle connections the pool may keep per host.
    pub fn idle_per_host_limit(&self) -> usize {
        self.max_idle_per_host.min(self.max_idle_connections)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 100,
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(90),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// JSON-over-HTTP/1.1 exchange for one logical service.
///
/// Owns its own connection pool. Every request carries `User-Agent`, `X-Service-Name` and
/// the caller's context values as headers, and is raced against the context's deadline and
/// cancellation signal.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    service: String,
    http: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(service: impl Into<String>, config: TransportConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .http1_only()
            .pool_max_idle_per_host(config.idle_per_host_limit())
            .pool_idle_timeout(config.idle_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MeshError::config(format!("cannot build http client: {e}")))?;

        Ok(Self {
            service: service.into(),
            http,
            config,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Sends `req` (if any) as JSON to `url` and decodes a JSON response.
    ///
    /// An empty success body decodes as JSON `null`, so `()` and `Option<T>` responses work
    /// against endpoints that answer `204 No Content`.
    pub async fn call<Req, Resp>(
        &self,
        ctx: &CallCtx,
        method: Method,
        url: &str,
        req: Option<&Req>,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let body = match req {
            Some(req) => Some(serde_json::to_vec(req).map_err(|source| MeshError::Encode {
                service: self.service.clone(),
                method: method.clone(),
                path: url.to_string(),
                source,
            })?),
            None => None,
        };

        let bytes = self.exchange(ctx, method.clone(), url, body).await?;
        let payload: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };

        serde_json::from_slice(payload).map_err(|source| MeshError::Decode {
            service: self.service.clone(),
            method,
            url: url.to_string(),
            source,
        })
    }

    /// One request/response round trip. Returns the full body of a 2xx answer.
    async fn exchange(
        &self,
        ctx: &CallCtx,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(SERVICE_NAME_HEADER, self.service.as_str())
            .headers(context_headers(ctx)?);

        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, JSON).body(body);
        }

        let transport = |source: reqwest::Error| MeshError::Transport {
            service: self.service.clone(),
            method: method.clone(),
            url: url.to_string(),
            source,
        };

        ctx.run(async {
            let response = request.send().await.map_err(transport)?;
            let status = response.status();
            let bytes = response.bytes().await.map_err(transport)?.to_vec();

            if !status.is_success() {
                return Err(MeshError::Remote {
                    service: self.service.clone(),
                    method: method.clone(),
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: body_snippet(&String::from_utf8_lossy(&bytes)),
                });
            }

            Ok(bytes)
        })
        .await
    }
}

/// The context's values as request headers.
///
/// Rejects keys and values that cannot travel as HTTP headers, so a malformed context fails
/// locally as [`MeshError::InvalidHeader`] instead of as a transport error.
pub fn context_headers(ctx: &CallCtx) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (key, value) in ctx.values() {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| MeshError::InvalidHeader {
            name: key.to_string(),
            reason: "invalid header name",
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| MeshError::InvalidHeader {
            name: key.to_string(),
            reason: "invalid header value",
        })?;
        headers.append(name, value);
    }

    Ok(headers)
}
