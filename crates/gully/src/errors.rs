use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors attached to capability requests inside the transcript. The oracle
/// observes these as data on its next turn, so they must clone and serialize
/// alongside the messages that carry them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
