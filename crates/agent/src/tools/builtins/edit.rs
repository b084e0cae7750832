//! `edit_file`: exact-string replacement through the mounted [`Backend`] (§4.3).
//!
//! Matching is exact-substring only — no fuzzy/line-trimmed fallback. A
//! unique match is required unless `replace_all` is set, so an ambiguous
//! `old_string` fails loudly (`BackendError::Ambiguous`) rather than
//! guessing which occurrence the caller meant.

use async_trait::async_trait;
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

pub struct EditTool;

impl EditTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EditTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Replace an exact occurrence of old_string with new_string in an \
                    existing file. old_string must match exactly, including whitespace, and \
                    must be unique in the file unless replace_all is set. Prefer giving enough \
                    surrounding context to make the match unique over setting replace_all."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Absolute path of the file to edit."
                        },
                        "old_string": {
                            "type": "string",
                            "description": "Exact text to replace."
                        },
                        "new_string": {
                            "type": "string",
                            "description": "Text to replace it with."
                        },
                        "replace_all": {
                            "type": "boolean",
                            "description": "Replace every occurrence instead of requiring a unique match.",
                            "default": false
                        }
                    },
                    "required": ["path", "old_string", "new_string"]
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
        let old_string = args
            .get("old_string")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("old_string is required".to_string()))?;
        let new_string = args
            .get("new_string")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("new_string is required".to_string()))?;
        let replace_all = args
            .get("replace_all")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if old_string == new_string {
            return Err(ToolError::InvalidRequest(
                "old_string and new_string must differ".to_string(),
            ));
        }

        let occurrences = ctx
            .backend()
            .edit(path, old_string, new_string, replace_all)
            .await?;

        let updated = ctx.backend().read_raw(path).await?;
        ctx.with_state(|state| state.record_edit(path, updated)).await;

        ctx.emit(Event::FileEdited {
            path: path.to_string(),
            occurrences,
        });

        Ok(serde_json::to_string_pretty(&json!({
            "path": path,
            "occurrences": occurrences,
        }))
        .unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BackendError, MemoryBackend};
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
    async fn replaces_unique_match() {
        let backend = MemoryBackend::with_files([("a.txt".to_string(), "hello world".to_string())]);
        let ctx = ctx(backend);
        let tool = EditTool::new();
        let result = tool
            .call(
                json!({"path": "/a.txt", "old_string": "world", "new_string": "there"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("\"occurrences\": 1"));
        assert_eq!(ctx.backend().read_raw("/a.txt").await.unwrap(), "hello there");
        let recorded = ctx
            .with_state(|state| state.files.get("/a.txt").cloned())
            .await
            .expect("edit_file should record the file in RunState");
        assert_eq!(recorded.joined(), "hello there");
    }

    #[tokio::test]
    async fn rejects_ambiguous_match_without_replace_all() {
        let backend =
            MemoryBackend::with_files([("a.txt".to_string(), "foo foo foo".to_string())]);
        let ctx = ctx(backend);
        let tool = EditTool::new();
        let err = tool
            .call(
                json!({"path": "/a.txt", "old_string": "foo", "new_string": "bar"}),
                &ctx,
            )
            .await
            .unwrap_err();
        match err {
            ToolError::Backend(BackendError::Ambiguous { count, .. }) => assert_eq!(count, 3),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn replace_all_replaces_every_occurrence() {
        let backend =
            MemoryBackend::with_files([("a.txt".to_string(), "foo foo foo".to_string())]);
        let ctx = ctx(backend);
        let tool = EditTool::new();
        let result = tool
            .call(
                json!({"path": "/a.txt", "old_string": "foo", "new_string": "bar", "replace_all": true}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("\"occurrences\": 3"));
        assert_eq!(ctx.backend().read_raw("/a.txt").await.unwrap(), "bar bar bar");
    }

    #[tokio::test]
    async fn rejects_identical_strings() {
        let backend = MemoryBackend::with_files([("a.txt".to_string(), "hello".to_string())]);
        let ctx = ctx(backend);
        let tool = EditTool::new();
        let err = tool
            .call(
                json!({"path": "/a.txt", "old_string": "hello", "new_string": "hello"}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidRequest(_)));
    }
}
