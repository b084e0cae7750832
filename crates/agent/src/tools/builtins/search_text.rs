//! `grep`: regex content search through the mounted [`Backend`] (§4.3).
//!
//! An invalid regex is reported back to the model as an error string
//! rather than propagated as an [`crate::error::AgentError`] — a malformed
//! pattern is the model's mistake to correct, not a runtime failure.

use async_trait::async_trait;
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::backend::GrepOptions;
use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

pub struct GrepTool;

impl GrepTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrepTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Search file contents under a path for a regex pattern. Returns \
                    matching file, line number, and line text for each hit."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "pattern": {
                            "type": "string",
                            "description": "Regex pattern to search for."
                        },
                        "path": {
                            "type": "string",
                            "description": "Directory to search under. Defaults to \"/\"."
                        },
                        "glob": {
                            "type": "string",
                            "description": "Restrict search to files matching this glob."
                        },
                        "case_insensitive": {
                            "type": "boolean",
                            "description": "Match case-insensitively.",
                            "default": false
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of matches to return. Defaults to 100.",
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
        let glob = args
            .get("glob")
            .and_then(Value::as_str)
            .map(str::to_string);
        let case_insensitive = args
            .get("case_insensitive")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(100) as usize;

        let matches = ctx
            .backend()
            .grep_raw(
                pattern,
                path,
                &GrepOptions {
                    glob,
                    case_insensitive,
                    limit,
                },
            )
            .await?;

        ctx.emit(Event::Grep {
            pattern: pattern.to_string(),
            count: matches.len(),
        });

        let truncated = matches.len() >= limit;
        let results: Vec<_> = matches
            .iter()
            .map(|m| {
                json!({
                    "path": m.path,
                    "line_number": m.line_number,
                    "line": m.line,
                })
            })
            .collect();

        Ok(serde_json::to_string_pretty(&json!({
            "matches": results,
            "count": matches.len(),
            "truncated": truncated,
        }))
        .unwrap())
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
    async fn finds_matching_lines() {
        let backend = MemoryBackend::with_files([(
            "a.txt".to_string(),
            "hello world\nfoo bar\nhello again".to_string(),
        )]);
        let ctx = ctx(backend);
        let tool = GrepTool::new();
        let result = tool.call(json!({"pattern": "hello"}), &ctx).await.unwrap();
        assert!(result.contains("\"count\": 2"));
    }

    #[tokio::test]
    async fn invalid_regex_returns_tool_error_not_panic() {
        let ctx = ctx(MemoryBackend::new());
        let tool = GrepTool::new();
        let err = tool.call(json!({"pattern": "("}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::Backend(_)));
    }
}
