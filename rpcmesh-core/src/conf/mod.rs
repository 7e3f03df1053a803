mod loader;
mod types;
mod validate;

#[cfg(test)]
mod tests;

pub use types::*;
