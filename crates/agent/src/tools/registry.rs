//! Tool registry for managing and looking up tools by name.

use crate::tools::context::Tool;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for managing available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn add(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn definitions(&self) -> Vec<agentcore_model::chat::Tool> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtins::ListTool;

    #[test]
    fn add_and_find_round_trips() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(ListTool::new()));
        assert!(registry.find("ls").is_some());
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn remove_drops_tool() {
        let mut registry = ToolRegistry::new();
        registry.add(Arc::new(ListTool::new()));
        registry.remove("ls");
        assert!(registry.find("ls").is_none());
    }
}
