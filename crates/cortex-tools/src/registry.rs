//! Tool Registry
//!
//! Filled once at startup, then shared read-only (`Arc<ToolRegistry>`).
//! Registration order is preserved and is the order tools are described
//! to the planner.

use std::collections::HashMap;
use tracing::info;

use crate::error::RegistryError;
use crate::tool::BoxedTool;

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<BoxedTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A name that is already taken is rejected and the
    /// existing tool stays in place.
    pub fn register(&mut self, tool: BoxedTool) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }

        info!(tool = %name, "Registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<BoxedTool> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tools in registration order
    pub fn all(&self) -> &[BoxedTool] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Catalogue for the planning prompt, one line per tool:
    /// `- <name>: <description> (parameters: a, b)`
    pub fn describe_all(&self) -> String {
        self.tools
            .iter()
            .map(|tool| {
                let params: Vec<String> = tool.parameters().into_iter().map(|p| p.name).collect();
                if params.is_empty() {
                    format!("- {}: {}", tool.name(), tool.description())
                } else {
                    format!(
                        "- {}: {} (parameters: {})",
                        tool.name(),
                        tool.description(),
                        params.join(", ")
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{SimpleTool, Tool, ToolParameter};
    use cortex_core::ToolResult;
    use std::sync::Arc;

    fn tool(name: &str, description: &str, params: &[&str]) -> BoxedTool {
        Arc::new(SimpleTool::new(
            name,
            description,
            params
                .iter()
                .map(|p| ToolParameter::required(p, "string", "test"))
                .collect(),
            |_| Ok(ToolResult::failure("unused")),
        ))
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("alpha", "First", &["a"])).unwrap();

        assert!(registry.has("alpha"));
        assert!(!registry.has("beta"));
        assert_eq!(registry.get("alpha").unwrap().description(), "First");
        assert!(registry.get("beta").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("alpha", "Original", &[])).unwrap();

        let err = registry.register(tool("alpha", "Impostor", &[])).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("alpha".to_string()));
        assert_eq!(err.to_string(), "Tool \"alpha\" is already registered");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("alpha").unwrap().description(), "Original");
    }

    #[test]
    fn test_describe_all_in_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("zeta", "Last letter", &["x", "y"])).unwrap();
        registry.register(tool("alpha", "First letter", &[])).unwrap();

        assert_eq!(registry.names(), vec!["zeta", "alpha"]);
        assert_eq!(
            registry.describe_all(),
            "- zeta: Last letter (parameters: x, y)\n- alpha: First letter"
        );
    }
}
