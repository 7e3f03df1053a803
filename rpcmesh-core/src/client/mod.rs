mod pool;
mod rpc;

#[cfg(test)]
mod tests;

pub use pool::*;
pub use rpc::*;
