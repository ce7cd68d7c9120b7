use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use chatflow_spec::Catalog;

use crate::error::EngineError;

/// Catalog bundled with the crate; used when no catalog path is configured.
pub const DEFAULT_CATALOG: &str =
    include_str!("../../chatflow-spec/tests/fixtures/tour_intake.json");

const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    /// Endpoint receiving answer snapshots. Submissions are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            webhook_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(EngineError::ConfigParse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Loads the configured catalog, or the bundled one.
    pub fn load_catalog(&self) -> Result<Catalog, EngineError> {
        let catalog = match &self.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::from_json(DEFAULT_CATALOG)?,
        };
        Ok(catalog)
    }
}
