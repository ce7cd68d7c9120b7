#![allow(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod submit;

pub use config::{DEFAULT_CATALOG, EngineConfig};
pub use engine::{Engine, EngineState, Outcome, Phase};
pub use error::EngineError;
pub use submit::{
    LogSubmitter, MemorySubmitter, SubmitError, Submitter, WebhookSubmitter, post_answers,
};
