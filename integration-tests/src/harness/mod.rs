mod consul;
mod http;
pub mod tracing;
mod upstream;

pub use self::consul::FakeConsul;
pub use self::http::{RecordedRequest, Reply};
pub use self::tracing::{CapturedEvent, init_test_tracing};
pub use self::upstream::Upstream;

use std::net::TcpListener;

/// A port nothing is listening on right now.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("failed to allocate port")
}
