//! Opaque model client contract (§6.1 of the runtime spec).
//!
//! The agent loop treats the underlying model as a streaming text/tool-calling
//! primitive: it hands over messages, a tool set, and an optional structured
//! output schema, and gets back text and/or tool calls. This crate defines
//! that shape without committing to any particular vendor.

use serde::{Deserialize, Serialize};

use chat::Tool;

/// Chat-based interaction with a model: messages, tools, streaming, structured output.
pub mod chat;

/// Error types shared across the model client boundary.
pub mod error;

/// Core trait a model client must implement to be driven by the agent loop.
pub trait ModelProvider: chat::ChatProvider {
    fn tools(&self) -> Option<&[Tool]> {
        None
    }
}

/// A tool call the model wants to make, standardized across providers.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct ToolCall {
    /// The ID of the tool call.
    pub id: String,
    /// The type of the tool call (usually "function").
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function to call.
    pub function: FunctionCall,
}

/// Which function to call and with what (JSON-serialized) arguments.
#[derive(Debug, Deserialize, Serialize, Clone, Eq, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// Token usage for a single model call, tolerant of provider field-naming differences.
#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq)]
pub struct Usage {
    #[serde(
        alias = "prompt_tokens",
        alias = "input_tokens",
        alias = "prompt_eval_count",
        alias = "promptTokenCount"
    )]
    pub input_tokens: u32,
    #[serde(
        alias = "completion_tokens",
        alias = "output_tokens",
        alias = "eval_count",
        alias = "candidatesTokenCount"
    )]
    pub output_tokens: u32,
}
