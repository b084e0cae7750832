//! The `Tool` trait and the per-call context every tool executes against.
//!
//! Two-trait shape: a capability object the loop builds once per run
//! (`ToolRunContext`), and a stateless executor the loop calls many times
//! (`Tool`). The context narrows to the two things a tool call needs beyond
//! its own arguments: the shared run state and an event-emission sink.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::Backend;
use crate::events::Event;
use crate::state::RunState;

/// Capability requirements a tool declares so a host can decide whether to
/// register it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CapabilityRequirement {
    /// Requires a mounted [`Backend`] (every filesystem tool).
    Filesystem,
    /// Requires the backend to additionally be a sandbox (the `execute` tool).
    Sandbox,
}

/// Tool-local failure. Per §7's propagation rule, a `ToolError` never
/// escapes the tool layer on its own — `Tool::call`'s `Err` is caught by
/// the loop and turned into a `tool-result` string with `is_error: true`,
/// never into an [`crate::error::AgentError`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("backend error: {0}")]
    Backend(#[from] crate::backend::BackendError),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Everything a tool call needs beyond its arguments: the shared run state,
/// the mounted backend, and a sink for the events §6.3 requires around
/// every tool's effect.
///
/// Cloning a `ToolRunContext` is cheap — every field is an `Arc`-backed
/// handle onto state the agent loop owns for the whole run.
#[derive(Clone)]
pub struct ToolRunContext {
    session_id: String,
    state: Arc<Mutex<RunState>>,
    backend: Arc<dyn Backend>,
    sink: Arc<dyn Fn(Event) + Send + Sync>,
    read_only: bool,
}

impl ToolRunContext {
    pub fn new(
        session_id: impl Into<String>,
        state: Arc<Mutex<RunState>>,
        backend: Arc<dyn Backend>,
        sink: Arc<dyn Fn(Event) + Send + Sync>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            state,
            backend,
            sink,
            read_only: false,
        }
    }

    /// Deny mutating tools (`write_file`, `edit_file`, `execute`) before
    /// they touch the backend. Orthogonal to approval gating (4.5): this is
    /// a static session property, approval is a per-call dynamic gate.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub async fn with_state<R>(&self, f: impl FnOnce(&mut RunState) -> R) -> R {
        let mut guard = self.state.lock().await;
        f(&mut guard)
    }

    pub fn emit(&self, event: Event) {
        (self.sink)(event);
    }

    pub fn deny_if_read_only(&self, tool_name: &str) -> Result<(), ToolError> {
        if self.read_only {
            Err(ToolError::PermissionDenied(format!(
                "{tool_name} is disabled: session is read-only"
            )))
        } else {
            Ok(())
        }
    }
}

/// A tool the loop can dispatch a model-issued call to: a name, a
/// JSON-schema-shaped definition, and a synchronous-looking `call` that
/// returns the string the model will see.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> agentcore_model::chat::Tool;

    /// Capabilities this tool requires. Default: none (always registrable).
    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[]
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn test_ctx() -> ToolRunContext {
        ToolRunContext::new(
            "s1",
            Arc::new(Mutex::new(RunState::new())),
            Arc::new(MemoryBackend::new()),
            Arc::new(|_| {}),
        )
    }

    #[test]
    fn deny_if_read_only_passes_when_writable() {
        let ctx = test_ctx();
        assert!(ctx.deny_if_read_only("write_file").is_ok());
    }

    #[test]
    fn deny_if_read_only_blocks_when_read_only() {
        let ctx = test_ctx().with_read_only(true);
        let err = ctx.deny_if_read_only("write_file").unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn with_state_mutates_shared_state() {
        let ctx = test_ctx();
        ctx.with_state(|s| s.step = 3).await;
        let step = ctx.with_state(|s| s.step).await;
        assert_eq!(step, 3);
    }
}
