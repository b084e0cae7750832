//! Structured error type for the agent crate.
//!
//! Tool-local failures are caught by the loop and turned into `tool-result`
//! events with `is_error: true` (see `tools::context::ToolError`); they never
//! reach here. `AgentError` is for failures that escalate out of the loop
//! itself: model transport failures, checkpoint I/O, and schema validation
//! failures on structured output.

use thiserror::Error;

use crate::backend::BackendError;
use crate::checkpoint::CheckpointError;
use agentcore_model::error::ModelError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("tool error: {0}")]
    Tool(#[from] crate::tools::context::ToolError),

    #[error("schema validation failed: {0}")]
    SchemaValidationFailure(String),

    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

