//! `read_file`: numbered-line reads through the mounted [`Backend`] (§4.3).
//!
//! Delegates entirely to `Backend::read`, which already implements the
//! `cat -n`-style numbering, the empty-file reminder, and the long-line
//! splitting (`format_cat_n`) — this tool only validates arguments and
//! emits the corresponding event.

use async_trait::async_trait;
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::backend::DEFAULT_READ_LIMIT;
use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

pub struct ReadFileTool;

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: format!(
                    "Read a file from the workspace. Returns content prefixed with \
                     cat -n-style line numbers. Defaults to the first {DEFAULT_READ_LIMIT} \
                     lines from the start; pass offset/limit to page through a longer file. \
                     An empty file returns a system reminder instead of blank content."
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Absolute path of the file to read."
                        },
                        "offset": {
                            "type": "integer",
                            "description": "0-based line offset to start from. Defaults to 0.",
                            "minimum": 0
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of lines to return.",
                            "minimum": 1
                        }
                    },
                    "required": ["path"]
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("path is required".to_string()))?;
        let offset = args.get("offset").and_then(Value::as_u64).map(|v| v as usize);
        let limit = args.get("limit").and_then(Value::as_u64).map(|v| v as usize);

        let content = ctx.backend().read(path, offset, limit).await?;
        ctx.emit(Event::FileRead {
            path: path.to_string(),
        });
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, EMPTY_FILE_NOTICE};
    use crate::state::RunState;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn ctx(backend: MemoryBackend) -> ToolRunContext {
        ToolRunContext::new(
            "s1",
            Arc::new(Mutex::new(RunState::new())),
            Arc::new(backend),
            Arc::new(|_| {}),
        )
    }

    #[tokio::test]
    async fn reads_file_with_numbered_lines() {
        let backend = MemoryBackend::with_files([("a.txt".to_string(), "one\ntwo\n".to_string())]);
        let ctx = ctx(backend);
        let tool = ReadFileTool::new();
        let result = tool.call(json!({"path": "/a.txt"}), &ctx).await.unwrap();
        assert!(result.contains("     1\tone"));
        assert!(result.contains("     2\ttwo"));
    }

    #[tokio::test]
    async fn empty_file_yields_reminder() {
        let backend = MemoryBackend::with_files([("empty.txt".to_string(), String::new())]);
        let ctx = ctx(backend);
        let tool = ReadFileTool::new();
        let result = tool.call(json!({"path": "/empty.txt"}), &ctx).await.unwrap();
        assert_eq!(result, EMPTY_FILE_NOTICE);
    }

    #[tokio::test]
    async fn missing_file_errors() {
        let ctx = ctx(MemoryBackend::new());
        let tool = ReadFileTool::new();
        let err = tool.call(json!({"path": "/missing.txt"}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Backend(_)));
    }
}
