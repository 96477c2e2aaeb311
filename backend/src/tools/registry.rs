//! Capability table mapping tool names to their handlers.

use async_trait::async_trait;
use brygga_types::{ContentItem, ToolDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::{Arguments, ToolFailure};

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and input schema.
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool with already-coerced arguments.
    async fn call(&self, args: Arguments) -> Result<Vec<ContentItem>, ToolFailure>;
}

/// Registered tools, listed in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: impl Tool + 'static) -> &mut Self {
        let name = tool.descriptor().name;
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.by_name.get(&name) {
            Some(&index) => {
                debug!("Replacing tool '{}'", name);
                self.tools[index] = tool;
            }
            None => {
                debug!("Registering tool '{}'", name);
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        self
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&index| &self.tools[index])
    }

    /// Descriptors of all registered tools.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|tool| tool.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Constant(&'static str, &'static str);

    #[async_trait]
    impl Tool for Constant {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor::new(self.0, "constant", json!({"type": "object"}))
        }

        async fn call(&self, _args: Arguments) -> Result<Vec<ContentItem>, ToolFailure> {
            Ok(vec![ContentItem::text(self.1)])
        }
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Constant("a", "first"))
            .register(Constant("b", "other"))
            .register(Constant("a", "second"));

        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        let content = registry
            .get("a")
            .unwrap()
            .call(Arguments::default())
            .await
            .unwrap();
        assert_eq!(content, vec![ContentItem::text("second")]);
    }

    #[test]
    fn test_missing_tool() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("nope").is_none());
    }
}
