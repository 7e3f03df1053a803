//! Client-side service mesh primitives: registry binding, TTL-cached discovery, load
//! balancing, and a resilient JSON-over-HTTP RPC pipeline
//! (`breaker(retry(resolve -> transport))`).

pub mod client;
pub mod conf;
pub mod ctx;
pub mod discovery;
pub mod error;
pub mod health;
pub mod logging;
pub mod net;
pub mod registry;
pub mod traffic;
pub mod transport;

pub use client::{ClientOptions, ClientPool, RpcClient};
pub use conf::MeshConfig;
pub use ctx::{CallCtx, CancelHandle};
pub use error::{ErrorKind, MeshError, Result};
