//! `execute`: run a shell command against a sandboxed backend (§4.3).
//!
//! Unlike the other filesystem tools, `ExecuteTool` holds its own
//! `Arc<dyn SandboxBackend>` rather than going through `ToolRunContext`'s
//! generic `Backend` handle — only a host that mounted a sandbox-backed
//! workspace can construct one, which is what makes `execute` absent
//! (simply never registered) when no sandbox is configured. On timeout the
//! tool returns the literal `"timed out"` rather than raising a runtime
//! error, since a slow command is the model's concern to retry or narrow.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::backend::sandbox::{ExecuteOptions, SandboxBackend};
use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

pub struct ExecuteTool {
    sandbox: Arc<dyn SandboxBackend>,
}

impl ExecuteTool {
    pub fn new(sandbox: Arc<dyn SandboxBackend>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ExecuteTool {
    fn name(&self) -> &str {
        "execute"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Sandbox]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Run a shell command in the sandboxed workspace and return its \
                    stdout, stderr, and exit code. Commands are subject to the configured \
                    timeout; a command that exceeds it is reported as timed out rather than \
                    left running."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "Shell command to run."
                        },
                        "timeout_ms": {
                            "type": "integer",
                            "description": "Maximum time to allow the command to run, in milliseconds.",
                            "minimum": 1
                        }
                    },
                    "required": ["command"]
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        ctx.deny_if_read_only(self.name())?;

        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidRequest("command is required".to_string()))?;
        let timeout = args
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis);

        ctx.emit(Event::ExecuteStart {
            command: command.to_string(),
        });

        let result = self
            .sandbox
            .execute(command, &ExecuteOptions { timeout, cwd: None })
            .await?;

        ctx.emit(Event::ExecuteFinish {
            command: command.to_string(),
            exit_code: result.exit_code,
            truncated: false,
        });

        if result.timed_out {
            return Ok(serde_json::to_string_pretty(&json!({
                "timed_out": true,
                "message": crate::backend::sandbox::TIMED_OUT_MESSAGE,
            }))
            .unwrap());
        }

        Ok(serde_json::to_string_pretty(&json!({
            "exit_code": result.exit_code,
            "stdout": result.stdout,
            "stderr": result.stderr,
        }))
        .unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalSandboxBackend;
    use crate::state::RunState;
    use tokio::sync::Mutex;

    fn ctx(sandbox: Arc<LocalSandboxBackend>) -> ToolRunContext {
        ToolRunContext::new(
            "s1",
            Arc::new(Mutex::new(RunState::new())),
            sandbox,
            Arc::new(|_| {}),
        )
    }

    #[tokio::test]
    async fn runs_command_and_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(LocalSandboxBackend::new("t1", dir.path().to_path_buf(), false));
        let ctx = ctx(sandbox.clone());
        let tool = ExecuteTool::new(sandbox);
        let result = tool.call(json!({"command": "echo hi"}), &ctx).await.unwrap();
        assert!(result.contains("\"exit_code\": 0"));
        assert!(result.contains("hi"));
    }

    #[tokio::test]
    async fn reports_timeout_literal() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(LocalSandboxBackend::new("t1", dir.path().to_path_buf(), false));
        let ctx = ctx(sandbox.clone());
        let tool = ExecuteTool::new(sandbox);
        let result = tool
            .call(json!({"command": "sleep 5", "timeout_ms": 50}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("timed out"));
    }

    #[tokio::test]
    async fn denied_when_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Arc::new(LocalSandboxBackend::new("t1", dir.path().to_path_buf(), false));
        let ctx = ctx(sandbox.clone()).with_read_only(true);
        let tool = ExecuteTool::new(sandbox);
        let err = tool
            .call(json!({"command": "echo hi"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_)));
    }
}
