//! The fixed C3 tool set: todos, the six filesystem primitives, sandboxed
//! command execution, subagent delegation, and the web tools.
//!
//! `task` (subagent delegation) lives in [`crate::subagent`] rather than
//! here, since it needs the registry it is itself listed in.

pub mod edit;
pub mod fetch_url;
pub mod glob;
pub mod http_request;
pub mod ls;
pub mod read_file;
pub mod search_text;
pub mod shell;
pub mod todo;
pub mod web_search;
pub mod write_file;

pub use edit::EditTool;
pub use fetch_url::FetchUrlTool;
pub use glob::GlobTool;
pub use http_request::HttpRequestTool;
pub use ls::ListTool;
pub use read_file::ReadFileTool;
pub use search_text::GrepTool;
pub use shell::ExecuteTool;
pub use todo::WriteTodosTool;
pub use web_search::WebSearchTool;
pub use write_file::WriteFileTool;

use crate::backend::SandboxBackend;
use crate::tools::Tool;
use std::sync::Arc;

/// The filesystem + todo tools every run gets, independent of whether the
/// backend is sandbox-capable. This is the canonical source of truth for
/// which tools are always registered.
pub fn filesystem_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(WriteTodosTool::new()),
        Arc::new(ListTool::new()),
        Arc::new(ReadFileTool::new()),
        Arc::new(WriteFileTool::new()),
        Arc::new(EditTool::new()),
        Arc::new(GlobTool::new()),
        Arc::new(GrepTool::new()),
    ]
}

/// `execute` is only ever present when the mounted backend is a sandbox
/// (§4.3): it requires `CapabilityRequirement::Sandbox`, which a plain
/// in-memory, disk, or kv backend cannot satisfy.
pub fn sandbox_tools(sandbox: Arc<dyn SandboxBackend>) -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(ExecuteTool::new(sandbox))]
}

/// Web tools: `http_request` and `fetch_url` need no credentials; `web_search`
/// needs a vendor API key, so it is constructed separately by the caller
/// when one is configured.
pub fn web_tools() -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(HttpRequestTool::new()), Arc::new(FetchUrlTool::new())]
}
