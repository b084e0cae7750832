//! Wire-stable event taxonomy emitted by a running agent.
//!
//! A `#[serde(tag = "type", rename_all = "kebab-case")]` enum wrapped in an
//! envelope carrying a sequence number and session id, so consumers can
//! reconstruct ordering and route events across concurrent runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use agentcore_model::ToolCall;

/// Monotonic envelope around an [`Event`], stamped with a per-run sequence
/// number so consumers can detect gaps or reorder a replayed stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub seq: u64,
    pub session_id: String,
    #[serde(flatten)]
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    UserMessage {
        content: String,
    },
    Text {
        content: String,
    },
    TextSegment {
        delta: String,
    },
    StepStart {
        step: u32,
    },
    StepFinish {
        step: u32,
    },
    ToolCall {
        tool_call_id: String,
        name: String,
        arguments: Value,
    },
    ToolResult {
        tool_call_id: String,
        name: String,
        result: String,
        is_error: bool,
    },
    TodosChanged {
        todos: Value,
    },
    FileWriteStart {
        path: String,
    },
    FileWritten {
        path: String,
        bytes: usize,
    },
    FileEdited {
        path: String,
        occurrences: usize,
    },
    FileRead {
        path: String,
    },
    Ls {
        path: String,
        count: usize,
    },
    Glob {
        pattern: String,
        count: usize,
    },
    Grep {
        pattern: String,
        count: usize,
    },
    ExecuteStart {
        command: String,
    },
    ExecuteFinish {
        command: String,
        exit_code: Option<i32>,
        truncated: bool,
    },
    WebSearchStart {
        query: String,
    },
    WebSearchFinish {
        query: String,
        count: usize,
    },
    HttpRequestStart {
        url: String,
    },
    HttpRequestFinish {
        url: String,
        status: Option<u16>,
    },
    FetchUrlStart {
        url: String,
    },
    FetchUrlFinish {
        url: String,
        truncated: bool,
    },
    SubagentStart {
        task_id: String,
        subagent_type: String,
        description: String,
    },
    SubagentFinish {
        task_id: String,
        result: String,
    },
    ApprovalRequested {
        tool_call_id: String,
        tool_name: String,
    },
    ApprovalResponse {
        tool_call_id: String,
        approved: bool,
    },
    CheckpointSaved {
        checkpoint_id: String,
    },
    CheckpointLoaded {
        checkpoint_id: String,
    },
    Done {
        reason: String,
        text: String,
        state: Value,
        output: Option<Value>,
    },
    Error {
        message: String,
    },
}

impl Event {
    /// A short machine-readable label matching the serialized `type` tag,
    /// handy for logging without re-serializing the whole event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user-message",
            Event::Text { .. } => "text",
            Event::TextSegment { .. } => "text-segment",
            Event::StepStart { .. } => "step-start",
            Event::StepFinish { .. } => "step-finish",
            Event::ToolCall { .. } => "tool-call",
            Event::ToolResult { .. } => "tool-result",
            Event::TodosChanged { .. } => "todos-changed",
            Event::FileWriteStart { .. } => "file-write-start",
            Event::FileWritten { .. } => "file-written",
            Event::FileEdited { .. } => "file-edited",
            Event::FileRead { .. } => "file-read",
            Event::Ls { .. } => "ls",
            Event::Glob { .. } => "glob",
            Event::Grep { .. } => "grep",
            Event::ExecuteStart { .. } => "execute-start",
            Event::ExecuteFinish { .. } => "execute-finish",
            Event::WebSearchStart { .. } => "web-search-start",
            Event::WebSearchFinish { .. } => "web-search-finish",
            Event::HttpRequestStart { .. } => "http-request-start",
            Event::HttpRequestFinish { .. } => "http-request-finish",
            Event::FetchUrlStart { .. } => "fetch-url-start",
            Event::FetchUrlFinish { .. } => "fetch-url-finish",
            Event::SubagentStart { .. } => "subagent-start",
            Event::SubagentFinish { .. } => "subagent-finish",
            Event::ApprovalRequested { .. } => "approval-requested",
            Event::ApprovalResponse { .. } => "approval-response",
            Event::CheckpointSaved { .. } => "checkpoint-saved",
            Event::CheckpointLoaded { .. } => "checkpoint-loaded",
            Event::Done { .. } => "done",
            Event::Error { .. } => "error",
        }
    }
}

/// Build a `tool-call` event from a standardized model tool call.
pub fn tool_call_event(call: &ToolCall) -> Event {
    let arguments: Value = serde_json::from_str(&call.function.arguments).unwrap_or(Value::Null);
    Event::ToolCall {
        tool_call_id: call.id.clone(),
        name: call.function.name.clone(),
        arguments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kebab_case_type_tag() {
        let event = Event::Done {
            reason: "completed".to_string(),
            text: "hi".to_string(),
            state: Value::Null,
            output: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "done");
        assert_eq!(json["reason"], "completed");
    }

    #[test]
    fn kind_matches_every_required_taxonomy_entry() {
        let required = [
            "user-message", "text", "text-segment", "step-start", "step-finish", "tool-call",
            "tool-result", "todos-changed", "file-write-start", "file-written", "file-edited",
            "file-read", "ls", "glob", "grep", "execute-start", "execute-finish",
            "web-search-start", "web-search-finish", "http-request-start", "http-request-finish",
            "fetch-url-start", "fetch-url-finish", "subagent-start", "subagent-finish",
            "approval-requested", "approval-response", "checkpoint-saved", "checkpoint-loaded",
            "done", "error",
        ];
        assert_eq!(required.len(), 31);
        assert!(required.contains(
            &Event::Done {
                reason: String::new(),
                text: String::new(),
                state: Value::Null,
                output: None,
            }
            .kind()
        ));
    }

    #[test]
    fn tool_call_event_parses_arguments() {
        let call = ToolCall {
            id: "t1".to_string(),
            call_type: "function".to_string(),
            function: agentcore_model::FunctionCall {
                name: "read_file".to_string(),
                arguments: "{\"path\":\"/a.txt\"}".to_string(),
            },
        };
        let event = tool_call_event(&call);
        match event {
            Event::ToolCall { arguments, name, .. } => {
                assert_eq!(name, "read_file");
                assert_eq!(arguments["path"], "/a.txt");
            }
            other => panic!("expected ToolCall, got {other:?}"),
        }
    }
}
