//! `write_file`: create a new file through the mounted [`Backend`] (§4.3).
//!
//! Only creates files — an existing path is an `already-exists` error
//! (`edit_file` is the mutator for content that already exists). Emits a
//! `file-write-start`/`file-written` pair around the backend call so a
//! host can show progress on large writes.

use async_trait::async_trait;
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

pub struct WriteFileTool;

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Write content to a new file. Fails if the file already exists — \
                    use edit_file to modify an existing file."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Absolute path of the file to create."
                        },
                        "content": {
                            "type": "string",
                            "description": "Full content to write."
                        }
                    },
                    "required": ["path", "content"]
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        ctx.deny_if_read_only(self.name())?;

        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("path is required".to_string()))?;
        let content = args
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("content is required".to_string()))?;

        ctx.emit(Event::FileWriteStart {
            path: path.to_string(),
        });
        ctx.backend().write(path, content).await?;
        ctx.with_state(|state| state.record_write(path, content)).await;
        ctx.emit(Event::FileWritten {
            path: path.to_string(),
            bytes: content.len(),
        });

        Ok(serde_json::to_string_pretty(&json!({
            "path": path,
            "bytes": content.len(),
        }))
        .unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
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
    async fn creates_new_file() {
        let ctx = ctx(MemoryBackend::new());
        let tool = WriteFileTool::new();
        let result = tool
            .call(json!({"path": "/a.txt", "content": "hello"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("\"bytes\": 5"));
        let content = ctx.backend().read_raw("/a.txt").await.unwrap();
        assert_eq!(content, "hello");
    }

    #[tokio::test]
    async fn mirrors_the_write_into_run_state_files() {
        let ctx = ctx(MemoryBackend::new());
        let tool = WriteFileTool::new();
        tool.call(json!({"path": "/a.txt", "content": "hello"}), &ctx)
            .await
            .unwrap();
        let recorded = ctx
            .with_state(|state| state.files.get("/a.txt").cloned())
            .await
            .expect("write_file should record the file in RunState");
        assert_eq!(recorded.content, vec!["hello".to_string()]);
        assert_eq!(recorded.created_at, recorded.modified_at);
    }

    #[tokio::test]
    async fn rejects_existing_file() {
        let backend = MemoryBackend::with_files([("a.txt".to_string(), "existing".to_string())]);
        let ctx = ctx(backend);
        let tool = WriteFileTool::new();
        let err = tool
            .call(json!({"path": "/a.txt", "content": "new"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Backend(_)));
    }

    #[tokio::test]
    async fn denied_when_read_only() {
        let ctx = ctx(MemoryBackend::new()).with_read_only(true);
        let tool = WriteFileTool::new();
        let err = tool
            .call(json!({"path": "/a.txt", "content": "hello"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_)));
    }
}
