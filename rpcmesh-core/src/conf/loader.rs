use crate::conf::MeshConfig;
use crate::error::{MeshError, Result};
use std::path::Path;
use std::str::FromStr;

impl MeshConfig {
    /// Reads, parses and validates a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MeshError::config(format!("failed to read config file {}: {e}", path.display()))
        })?;

        text.parse().map_err(|e: MeshError| match e {
            MeshError::Config { message } => {
                MeshError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }
}

impl FromStr for MeshConfig {
    type Err = MeshError;

    fn from_str(text: &str) -> Result<Self> {
        let cfg: MeshConfig = toml::from_str(text)
            .map_err(|e| MeshError::config(format!("failed to parse TOML: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
