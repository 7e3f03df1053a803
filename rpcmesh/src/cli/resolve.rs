use crate::cli::load;
use rpcmesh_core::{CallCtx, ClientPool};
use std::path::Path;

pub async fn resolve(path: &Path, service: &str, all: bool) -> anyhow::Result<()> {
    let cfg = load(path)?;
    let pool = ClientPool::connect(&cfg)?;
    let ctx = CallCtx::background().with_timeout(cfg.default_timeout());

    if all {
        let instances = ctx.run(pool.resolver().instances(service)).await?;
        for instance in instances.iter() {
            println!("{}\t{}", instance.id, instance.endpoint());
        }
    } else {
        let instance = ctx.run(pool.resolver().resolve(service)).await?;
        println!("{}", instance.endpoint());
    }

    Ok(())
}
