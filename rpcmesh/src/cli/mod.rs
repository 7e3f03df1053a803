mod call;
mod check;
mod register;
mod resolve;

pub use call::*;
pub use check::*;
pub use register::*;
pub use resolve::*;

use anyhow::Context;
use rpcmesh_core::MeshConfig;
use std::path::Path;

fn load(path: &Path) -> anyhow::Result<MeshConfig> {
    MeshConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}
