use std::path::PathBuf;

use thiserror::Error;

use chatflow_spec::CatalogError;

use crate::submit::SubmitError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("catalog defines no steps")]
    EmptyCatalog,
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("submission setup failed: {0}")]
    Submit(#[from] SubmitError),
}
