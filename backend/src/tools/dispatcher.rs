//! Tool invocation dispatcher.

use brygga_types::{CallToolResult, ContentItem, ToolDescriptor};
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

use super::{builtin, Arguments, ToolRegistry};

/// Why a tool call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFailureKind {
    /// No tool with the requested name
    UnknownTool,
    /// The tool ran and reported an error
    Execution,
}

impl fmt::Display for ToolFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ToolFailureKind::UnknownTool => "unknown tool",
            ToolFailureKind::Execution => "execution failed",
        };
        f.write_str(label)
    }
}

/// A failed tool call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolFailure {
    pub kind: ToolFailureKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ToolFailureKind::UnknownTool, format!("Unknown tool: {}", name))
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ToolFailureKind::Execution, message)
    }
}

/// Result of one tool invocation.
pub type ToolOutcome = Result<Vec<ContentItem>, ToolFailure>;

/// Looks up and runs tools. Holds no per-call state.
#[derive(Clone, Default)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Dispatcher over the built-in tool set.
    pub fn with_builtin_tools() -> Self {
        Self::new(builtin::registry())
    }

    /// Descriptors for `tools/list`.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    /// Invoke `name` with raw `arguments`.
    pub async fn invoke(&self, name: &str, arguments: Option<Value>) -> ToolOutcome {
        let Some(tool) = self.registry.get(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(ToolFailure::unknown_tool(name));
        };

        info!("Invoking tool '{}'", name);
        let outcome = tool.call(Arguments::from_value(arguments)).await;
        if let Err(ref failure) = outcome {
            warn!("Tool '{}' failed ({}): {}", name, failure.kind, failure.message);
        }
        outcome
    }

    /// Invoke and wrap the outcome in the `tools/call` result envelope.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> CallToolResult {
        match self.invoke(name, arguments).await {
            Ok(content) => CallToolResult::success(content),
            Err(failure) => CallToolResult::error(failure.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unknown_tool_is_tagged() {
        let dispatcher = ToolDispatcher::with_builtin_tools();
        let failure = dispatcher
            .invoke("doesNotExist", Some(json!({})))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, ToolFailureKind::UnknownTool);
        assert!(failure.message.contains("doesNotExist"));
    }

    #[tokio::test]
    async fn test_unknown_tool_envelope_is_error_result() {
        let dispatcher = ToolDispatcher::with_builtin_tools();
        let result = dispatcher.call("doesNotExist", None).await;
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);

        // Still usable afterwards
        let result = dispatcher.call("echo", Some(json!({"text": "hi"}))).await;
        assert!(!result.is_error);
        assert_eq!(result.content, vec![ContentItem::text("echo: hi")]);
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_tolerated() {
        let dispatcher = ToolDispatcher::with_builtin_tools();
        let content = dispatcher
            .invoke("echo", Some(json!("not an object")))
            .await
            .unwrap();
        assert_eq!(content, vec![ContentItem::text("echo: ")]);
    }

    #[test]
    fn test_lists_builtin_tools() {
        let dispatcher = ToolDispatcher::with_builtin_tools();
        let names: Vec<_> = dispatcher.list().into_iter().map(|d| d.name).collect();
        assert!(names.contains(&"echo".to_string()));
        assert!(names.contains(&"echo_repeat".to_string()));
    }
}
