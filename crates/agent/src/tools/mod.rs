pub mod builtins;
pub mod context;
pub mod registry;

pub use builtins::{
    EditTool, ExecuteTool, FetchUrlTool, GlobTool, GrepTool, HttpRequestTool, ListTool,
    ReadFileTool, WebSearchTool, WriteFileTool, WriteTodosTool,
};
pub use context::{CapabilityRequirement, Tool, ToolError, ToolRunContext};
pub use registry::ToolRegistry;
