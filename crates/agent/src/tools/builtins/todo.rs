//! `write_todos`: the sole mutator of `state.todos` (§3, §4.3).
//!
//! Todos live on the run's own `RunState` rather than in process-wide
//! memory, so they travel with checkpoints (see `state.rs`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::events::Event;
use crate::state::{Todo, TodoStatus};
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

#[derive(Debug, Deserialize)]
struct TodoInput {
    id: String,
    content: String,
    status: TodoStatus,
}

impl From<TodoInput> for Todo {
    fn from(t: TodoInput) -> Self {
        Todo {
            id: t.id,
            content: t.content,
            status: t.status,
        }
    }
}

pub struct WriteTodosTool;

impl WriteTodosTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteTodosTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteTodosTool {
    fn name(&self) -> &str {
        "write_todos"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Use this tool to create and manage a structured task list for \
                    your current session. This helps you track progress, organize complex \
                    tasks, and demonstrate thoroughness to the user.\n\n\
                    Use it proactively when a task needs 3 or more distinct steps, when the \
                    user gives you multiple things to do, or right after you complete one \
                    step and want to mark the next as in_progress. Only one todo should be \
                    in_progress at a time. Each todo's content must be 100 characters or \
                    fewer.\n\n\
                    Set merge=true to upsert by id (existing ids are updated in place, new \
                    ids are appended) instead of replacing the whole list."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "todos": {
                            "type": "array",
                            "description": "The todo items to write",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "id": { "type": "string" },
                                    "content": { "type": "string", "maxLength": 100 },
                                    "status": {
                                        "type": "string",
                                        "enum": ["pending", "in_progress", "completed", "cancelled"]
                                    }
                                },
                                "required": ["id", "content", "status"]
                            }
                        },
                        "merge": {
                            "type": "boolean",
                            "description": "Merge by id instead of replacing the whole list",
                            "default": false
                        }
                    },
                    "required": ["todos"]
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        let todos_val = args
            .get("todos")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::InvalidRequest("todos array is required".to_string()))?;

        let todos: Vec<Todo> = todos_val
            .iter()
            .map(|v| serde_json::from_value::<TodoInput>(v.clone()).map(Todo::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ToolError::InvalidRequest(format!("invalid todo: {e}")))?;

        let merge = args
            .get("merge")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let result = ctx
            .with_state(|state| {
                if merge {
                    state.merge_todos(todos)
                } else {
                    state.replace_todos(todos)
                }
            })
            .await;
        result.map_err(ToolError::InvalidRequest)?;

        let snapshot = ctx.with_state(|state| state.todos.clone()).await;
        let todos_json = serde_json::to_value(&snapshot).unwrap_or(Value::Null);
        ctx.emit(Event::TodosChanged {
            todos: todos_json.clone(),
        });

        Ok(serde_json::to_string_pretty(&json!({
            "success": true,
            "total_todos": snapshot.len(),
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

    fn ctx() -> ToolRunContext {
        ToolRunContext::new(
            "s1",
            Arc::new(Mutex::new(RunState::new())),
            Arc::new(MemoryBackend::new()),
            Arc::new(|_| {}),
        )
    }

    #[tokio::test]
    async fn write_todos_replaces_list_and_emits_event() {
        let ctx = ctx();
        let tool = WriteTodosTool::new();
        let result = tool
            .call(
                json!({"todos": [{"id": "1", "content": "draft", "status": "in_progress"}]}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(result.contains("\"total_todos\": 1"));
        let todos = ctx.with_state(|s| s.todos.clone()).await;
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, "1");
    }

    #[tokio::test]
    async fn write_todos_rejects_overlong_content() {
        let ctx = ctx();
        let tool = WriteTodosTool::new();
        let err = tool
            .call(
                json!({"todos": [{"id": "1", "content": "x".repeat(200), "status": "pending"}]}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn merge_preserves_other_ids() {
        let ctx = ctx();
        let tool = WriteTodosTool::new();
        tool.call(
            json!({"todos": [
                {"id": "1", "content": "a", "status": "pending"},
                {"id": "2", "content": "b", "status": "pending"}
            ]}),
            &ctx,
        )
        .await
        .unwrap();
        tool.call(
            json!({"todos": [{"id": "1", "content": "a", "status": "completed"}], "merge": true}),
            &ctx,
        )
        .await
        .unwrap();
        let todos = ctx.with_state(|s| s.todos.clone()).await;
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[0].status, TodoStatus::Completed);
    }
}
