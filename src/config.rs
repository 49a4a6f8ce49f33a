use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::ChunkerParams;
use crate::error::{Error, IoResultExt, Result};

/// store configuration persisted in config.toml
///
/// the chunker parameters are recorded at creation time because they are
/// wire format: opening a store with different parameters would silently
/// produce different digests for the same data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    pub chunker: ChunkerParams,
}

impl Config {
    /// load config from file, rejecting unusable parameter combinations
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.chunker;
        if p.target_size == 0 || p.min_size == 0 || p.max_size == 0 {
            return Err(Error::InvalidConfig(
                "chunker sizes must be non-zero".to_string(),
            ));
        }
        if p.min_size > p.target_size || p.target_size > p.max_size {
            return Err(Error::InvalidConfig(format!(
                "chunker sizes must satisfy min <= target <= max, got {}/{}/{}",
                p.min_size, p.target_size, p.max_size
            )));
        }
        Ok(())
    }
}
