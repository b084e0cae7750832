//! `glob`: fast path-pattern matching through the mounted [`Backend`] (§4.3).

use async_trait::async_trait;
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::backend::GlobOptions;
use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

pub struct GlobTool;

impl GlobTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GlobTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Fast file pattern matching. Supports glob patterns like \
                    \"**/*.rs\" or \"src/**/*.ts\". Returns matching file paths sorted by \
                    modification time, most recent first. Prefer this over ls when you \
                    already know a filename pattern."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "pattern": {
                            "type": "string",
                            "description": "Glob pattern to match file paths against."
                        },
                        "path": {
                            "type": "string",
                            "description": "Directory to search under. Defaults to \"/\"."
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of results to return. Defaults to 100.",
                            "default": 100,
                            "minimum": 1
                        }
                    },
                    "required": ["pattern"]
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        let pattern = args
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("pattern is required".to_string()))?;
        let path = args.get("path").and_then(Value::as_str).unwrap_or("/");
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(100) as usize;

        let (matches, truncated) = ctx
            .backend()
            .glob_info(pattern, path, &GlobOptions { limit })
            .await?;

        ctx.emit(Event::Glob {
            pattern: pattern.to_string(),
            count: matches.len(),
        });

        let mut output = serde_json::to_string_pretty(&json!({
            "matches": matches,
            "count": matches.len(),
            "truncated": truncated,
        }))
        .unwrap();

        if truncated {
            output.push_str(&format!(
                "\n\n[Results limited to {limit}. Refine your pattern to see more specific matches.]"
            ));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
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
    async fn matches_pattern_and_excludes_others() {
        let backend = MemoryBackend::with_files([
            ("test.rs".to_string(), "content".to_string()),
            ("src/main.rs".to_string(), "content".to_string()),
            ("test.txt".to_string(), "content".to_string()),
        ]);
        let ctx = ctx(backend);
        let tool = GlobTool::new();
        let result = tool.call(json!({"pattern": "**/*.rs"}), &ctx).await.unwrap();
        assert!(result.contains("test.rs"));
        assert!(result.contains("main.rs"));
        assert!(!result.contains("test.txt"));
    }

    #[tokio::test]
    async fn limit_truncates_results() {
        let files: Vec<(String, String)> = (0..10)
            .map(|i| (format!("test{i}.rs"), "content".to_string()))
            .collect();
        let backend = MemoryBackend::with_files(files);
        let ctx = ctx(backend);
        let tool = GlobTool::new();
        let result = tool
            .call(json!({"pattern": "*.rs", "limit": 5}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("\"count\": 5"));
        assert!(result.contains("\"truncated\": true"));
    }
}
