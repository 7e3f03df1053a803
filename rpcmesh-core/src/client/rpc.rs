use crate::ctx::CallCtx;
use crate::discovery::ServiceResolver;
use crate::error::{MeshError, Result};
use crate::traffic::{Breaker, CircuitBreakerParams, RetryConfig, RetryPolicy};
use crate::transport::{HttpTransport, TransportConfig, context_headers};
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Per-client knobs. A [`ClientPool`](crate::client::ClientPool) hands the same options to
/// every client it creates.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub transport: TransportConfig,
    pub retry: RetryConfig,
    pub breaker: CircuitBreakerParams,
    /// Retry only transport failures, 5xx and 429 instead of every error.
    pub retry_only_transient: bool,
}

impl ClientOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.request_timeout = timeout;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_breaker(mut self, breaker: CircuitBreakerParams) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn retry_only_transient(mut self, enabled: bool) -> Self {
        self.retry_only_transient = enabled;
        self
    }
}

/// Typed JSON RPC against one logical service.
///
/// Each call runs `breaker(retry(resolve -> http))`: an instance is resolved afresh for
/// every attempt, retries stay inside the breaker, and only the final outcome of the whole
/// call feeds the breaker.
#[derive(Debug)]
pub struct RpcClient {
    service: String,
    resolver: Arc<ServiceResolver>,
    transport: HttpTransport,
    retry: RetryPolicy,
    breaker: Breaker,
    retry_only_transient: bool,
}

impl RpcClient {
    pub fn new(
        service: impl Into<String>,
        resolver: Arc<ServiceResolver>,
        options: ClientOptions,
    ) -> Result<Self> {
        let service = service.into();

        Ok(Self {
            transport: HttpTransport::new(service.clone(), options.transport)?,
            retry: RetryPolicy::new(options.retry),
            breaker: Breaker::new(service.clone(), options.breaker),
            retry_only_transient: options.retry_only_transient,
            resolver,
            service,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn breaker(&self) -> &Breaker {
        &self.breaker
    }

    pub fn resolver(&self) -> &Arc<ServiceResolver> {
        &self.resolver
    }

    pub async fn call<Req, Resp>(
        &self,
        ctx: &CallCtx,
        method: Method,
        path: &str,
        req: Option<&Req>,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        // A context that cannot be encoded as headers fails every attempt the same way.
        context_headers(ctx)?;

        let path = normalize_path(path);
        self.breaker
            .call(|| self.with_retry(ctx, &method, &path, req))
            .await
    }

    pub async fn get<Resp: DeserializeOwned>(&self, ctx: &CallCtx, path: &str) -> Result<Resp> {
        self.call::<(), Resp>(ctx, Method::GET, path, None).await
    }

    pub async fn post<Req, Resp>(&self, ctx: &CallCtx, path: &str, req: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        self.call(ctx, Method::POST, path, Some(req)).await
    }

    pub async fn put<Req, Resp>(&self, ctx: &CallCtx, path: &str, req: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        self.call(ctx, Method::PUT, path, Some(req)).await
    }

    pub async fn delete<Resp: DeserializeOwned>(&self, ctx: &CallCtx, path: &str) -> Result<Resp> {
        self.call::<(), Resp>(ctx, Method::DELETE, path, None).await
    }

    /// Untyped variant for tooling: any JSON in, any JSON out.
    pub async fn call_raw(
        &self,
        ctx: &CallCtx,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value> {
        self.call(ctx, method, path, body).await
    }

    async fn with_retry<Req, Resp>(
        &self,
        ctx: &CallCtx,
        method: &Method,
        path: &str,
        req: Option<&Req>,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let attempt = |n| self.attempt(ctx, method, path, req, n);

        if self.retry_only_transient {
            self.retry
                .run_if(ctx, attempt, MeshError::is_retryable)
                .await
        } else {
            self.retry.run(ctx, attempt).await
        }
    }

    async fn attempt<Req, Resp>(
        &self,
        ctx: &CallCtx,
        method: &Method,
        path: &str,
        req: Option<&Req>,
        attempt: u32,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let instance = ctx.run(self.resolver.resolve(&self.service)).await?;
        let url = format!("http://{}{}", instance.endpoint(), path);

        tracing::debug!(
            service = %self.service,
            instance = %instance.id,
            %method,
            %url,
            attempt,
            "dispatching rpc"
        );

        self.transport.call(ctx, method.clone(), &url, req).await
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
