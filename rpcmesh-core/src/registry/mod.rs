mod adapter;
mod backend;
mod consul;
mod memory;
mod types;

pub use adapter::*;
pub use backend::*;
pub use consul::*;
pub use memory::*;
pub use types::*;
