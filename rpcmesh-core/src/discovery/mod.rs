mod cache;
mod resolver;


pub use cache::*;
pub use resolver::*;
