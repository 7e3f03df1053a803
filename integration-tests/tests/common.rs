use integration_tests::harness::FakeConsul;
use rpcmesh_core::{ClientPool, MeshConfig};

/// Config pointing at `consul`, with quick retries so failing paths stay fast.
#[allow(dead_code)]
pub fn mesh_config(consul: &FakeConsul) -> MeshConfig {
    let mut cfg = MeshConfig {
        registry_address: consul.address(),
        default_timeout_ms: 2_000,
        ..MeshConfig::default()
    };
    cfg.retry.initial_delay_ms = 10;
    cfg
}

#[allow(dead_code)]
pub fn pool(cfg: &MeshConfig) -> ClientPool {
    ClientPool::connect(cfg).expect("failed to build client pool")
}
