//! Run-local state: todos and per-run bookkeeping persisted across steps.
//!
//! Todos live on the run's own state struct rather than in a global
//! process-wide map, so they travel with checkpoints and stay isolated
//! between concurrent runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// Maximum length of a [`Todo::content`] string, enforced by `write_todos`.
pub const TODO_CONTENT_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
}

/// A file as seen by the virtual filesystem: an ordered sequence of lines
/// plus the two timestamps every backend is required to maintain.
///
/// `created_at <= modified_at` always holds; lines never contain an
/// embedded `\n` (splitting is the backend's job, not the caller's).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileData {
    pub content: Vec<String>,
    pub created_at: String,
    pub modified_at: String,
}

impl FileData {
    pub fn new(content: impl Into<String>, now: impl Into<String>) -> Self {
        let now = now.into();
        Self {
            content: split_lines(&content.into()),
            created_at: now.clone(),
            modified_at: now,
        }
    }

    pub fn joined(&self) -> String {
        self.content.join("\n")
    }
}

fn split_lines(s: &str) -> Vec<String> {
    if s.is_empty() {
        Vec::new()
    } else {
        s.split('\n').map(str::to_string).collect()
    }
}

/// Current time as an ISO-8601 (RFC 3339) UTC string, the timestamp format
/// `FileData::created_at`/`modified_at` are specified in (§3).
pub fn now_iso8601() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Per-run state carried alongside the message history across steps and
/// through checkpoints. Shared by every tool in a run; subagents get their
/// own `todos` but the same `files` (see `crate::subagent::TaskTool`, which
/// constructs the subagent's `Agent` over the same `Backend` the parent's
/// `ToolRunContext` is mounted on).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunState {
    pub todos: Vec<Todo>,
    pub files: BTreeMap<String, FileData>,
    pub step: u32,
    pub cumulative_tokens: u64,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh `write_file` (or an eviction write): inserts a new
    /// entry with `created_at == modified_at == now`.
    pub fn record_write(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let now = now_iso8601();
        self.files.insert(path.into(), FileData::new(content, now));
    }

    /// Record an in-place `edit_file`: preserves `created_at`, bumps
    /// `modified_at` to now. Inserts a fresh entry if the path wasn't
    /// already tracked (e.g. a file created before `files` existed).
    pub fn record_edit(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let now = now_iso8601();
        match self.files.get_mut(&path) {
            Some(existing) => {
                existing.content = split_lines(&content.into());
                existing.modified_at = now;
            }
            None => {
                self.files.insert(path, FileData::new(content, now));
            }
        }
    }

    /// `write_todos` with `merge: false`: replace the list wholesale,
    /// enforcing the `content` length invariant.
    pub fn replace_todos(&mut self, todos: Vec<Todo>) -> Result<(), String> {
        for todo in &todos {
            if todo.content.chars().count() > TODO_CONTENT_MAX_LEN {
                return Err(format!(
                    "todo content exceeds {TODO_CONTENT_MAX_LEN} characters: {:?}",
                    todo.content
                ));
            }
        }
        self.todos = todos;
        Ok(())
    }

    /// `write_todos` with `merge: true`: upsert by id, preserving the
    /// position of existing ids and appending new ones in the order given.
    pub fn merge_todos(&mut self, todos: Vec<Todo>) -> Result<(), String> {
        for todo in &todos {
            if todo.content.chars().count() > TODO_CONTENT_MAX_LEN {
                return Err(format!(
                    "todo content exceeds {TODO_CONTENT_MAX_LEN} characters: {:?}",
                    todo.content
                ));
            }
        }
        for incoming in todos {
            if let Some(existing) = self.todos.iter_mut().find(|t| t.id == incoming.id) {
                *existing = incoming;
            } else {
                self.todos.push(incoming);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_todos_rejects_overlong_content() {
        let mut state = RunState::new();
        let err = state
            .replace_todos(vec![Todo {
                id: "1".into(),
                content: "x".repeat(101),
                status: TodoStatus::Pending,
            }])
            .unwrap_err();
        assert!(err.contains("exceeds"));
    }

    #[test]
    fn merge_todos_preserves_ids_and_updates_status() {
        let mut state = RunState::new();
        state
            .replace_todos(vec![Todo {
                id: "1".into(),
                content: "draft".into(),
                status: TodoStatus::Pending,
            }])
            .unwrap();
        state
            .merge_todos(vec![
                Todo {
                    id: "1".into(),
                    content: "draft".into(),
                    status: TodoStatus::Completed,
                },
                Todo {
                    id: "2".into(),
                    content: "review".into(),
                    status: TodoStatus::Pending,
                },
            ])
            .unwrap();
        assert_eq!(state.todos.len(), 2);
        assert_eq!(state.todos[0].status, TodoStatus::Completed);
        assert_eq!(state.todos[1].id, "2");
    }
}
