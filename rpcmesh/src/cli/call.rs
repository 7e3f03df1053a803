use crate::cli::load;
use anyhow::{Context, bail};
use http::Method;
use rpcmesh_core::{CallCtx, ClientPool};
use std::path::Path;
use std::time::Duration;

#[derive(Debug)]
pub struct CallRequest {
    pub service: String,
    pub method: String,
    pub path: String,
    pub data: Option<String>,
    pub headers: Vec<String>,
    pub timeout_ms: Option<u64>,
}

pub async fn call(path: &Path, request: CallRequest) -> anyhow::Result<()> {
    let cfg = load(path)?;
    let pool = ClientPool::connect(&cfg)?;
    let client = pool.get(&request.service)?;

    let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{}'", request.method))?;

    let body: Option<serde_json::Value> = request
        .data
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--data is not valid JSON")?;

    let mut ctx = CallCtx::background();
    if let Some(ms) = request.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(ms));
    }
    for header in &request.headers {
        let Some((key, value)) = header.split_once('=') else {
            bail!("header '{header}' is not KEY=VALUE");
        };
        ctx = ctx.with_value(key.trim(), value.trim());
    }

    let response = client
        .call_raw(&ctx, method, &request.path, body.as_ref())
        .await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
