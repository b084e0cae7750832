//! `ls`: non-recursive directory listing over the mounted [`Backend`] (§4.3).
//!
//! Built against `Backend::ls_info` rather than walking `std::fs` directly,
//! so the same tool runs unmodified against any backend the agent is
//! configured with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use agentcore_model::chat::{FunctionTool, Tool as ChatTool};

use crate::backend::{EntryKind, LsOptions};
use crate::events::Event;
use crate::tools::context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    path: String,
    entry_type: String,
    size: Option<u64>,
    modified_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ListResults {
    entries: Vec<Entry>,
    total: usize,
    truncated: bool,
}

fn default_ignores() -> Vec<String> {
    [
        "node_modules/**",
        ".git/**",
        "dist/**",
        "build/**",
        "out/**",
        "target/**",
        ".next/**",
        ".nuxt/**",
        "vendor/**",
        "__pycache__/**",
        "*.pyc",
        ".venv/**",
        "venv/**",
        "coverage/**",
        ".cache/**",
        "tmp/**",
        "temp/**",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

pub struct ListTool;

impl ListTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ListTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListTool {
    fn name(&self) -> &str {
        "ls"
    }

    fn required_capabilities(&self) -> &'static [CapabilityRequirement] {
        &[CapabilityRequirement::Filesystem]
    }

    fn definition(&self) -> ChatTool {
        ChatTool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name().to_string(),
                description: "Lists files and directories in a given path, non-recursively. \
                    The path must be absolute; omit it to list the workspace root. You can \
                    optionally provide an array of glob patterns to ignore beyond the \
                    defaults. Prefer glob/grep when you already know which directories to \
                    search."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Absolute directory path to list. Defaults to \"/\"."
                        },
                        "ignore": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Additional glob patterns to ignore"
                        },
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of entries to return. Defaults to 100.",
                            "default": 100,
                            "minimum": 1
                        }
                    },
                    "required": []
                }),
            },
        }
    }

    async fn call(&self, args: Value, ctx: &ToolRunContext) -> Result<String, ToolError> {
        let path = args.get("path").and_then(Value::as_str).unwrap_or("/");
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(100) as usize;

        let mut ignore = default_ignores();
        if let Some(user_ignores) = args.get("ignore").and_then(Value::as_array) {
            ignore.extend(user_ignores.iter().filter_map(|v| v.as_str().map(str::to_string)));
        }

        let (entries, truncated) = ctx
            .backend()
            .ls_info(path, &LsOptions { ignore, limit })
            .await?;

        let total = entries.len();
        let entries: Vec<Entry> = entries
            .into_iter()
            .map(|e| Entry {
                path: e.path,
                entry_type: match e.kind {
                    EntryKind::File => "file",
                    EntryKind::Directory => "directory",
                }
                .to_string(),
                size: e.size,
                modified_at: e.modified_at,
            })
            .collect();

        ctx.emit(Event::Ls {
            path: path.to_string(),
            count: total,
        });

        Ok(serde_json::to_string_pretty(&ListResults {
            entries,
            total,
            truncated,
        })
        .unwrap())
    }
}
