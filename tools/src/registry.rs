//! Tool registry.
//!
//! An ordered, append-only list of tools looked up by name at dispatch time.
//! Each reasoning loop owns one.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, ToolError};
use crate::tool::Tool;

/// Ordered tool catalogue with unique names.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    name_index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from tools, rejecting duplicate names.
    pub fn from_tools(tools: impl IntoIterator<Item = Tool>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool.
    pub fn register(&mut self, tool: Tool) -> Result<()> {
        if self.name_index.contains_key(&tool.name) {
            return Err(ToolError::AlreadyExists(tool.name));
        }
        debug!("Registered tool: {}", tool.name);
        self.name_index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.name_index.get(name).and_then(|&i| self.tools.get(i))
    }

    /// Tools in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Tool> {
        self.tools.iter()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The catalogue as prompt text.
    pub fn render_catalogue(&self) -> String {
        self.tools
            .iter()
            .map(Tool::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ToolSpec;
    use crate::tool::ToolOutput;
    use pretty_assertions::assert_eq;

    fn tool(name: &str) -> Tool {
        Tool::from_fn(name, "test", ToolSpec::new(), |_, _| async {
            Ok(ToolOutput::new("ok"))
        })
    }

    #[test]
    fn test_lookup_keeps_order() {
        let registry = ToolRegistry::from_tools([tool("b"), tool("a")]).unwrap();

        assert_eq!(registry.names(), vec!["b", "a"]);
        assert_eq!(registry.get("a").map(|t| t.name.as_str()), Some("a"));
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = ToolRegistry::from_tools([tool("a"), tool("a")]).unwrap_err();
        assert!(matches!(err, ToolError::AlreadyExists(name) if name == "a"));
    }
}
