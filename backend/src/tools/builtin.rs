//! Built-in tools.

use async_trait::async_trait;
use brygga_types::{ContentItem, ToolDescriptor};
use serde_json::json;

use super::{Arguments, Tool, ToolFailure, ToolRegistry};

/// Bounds for `echo_repeat`'s `count`.
pub const MIN_REPEAT: i64 = 1;
pub const MAX_REPEAT: i64 = 5;

/// Registry holding every built-in tool.
pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(EchoTool)
        .register(EchoRepeatTool)
        .register(AddTool)
        .register(CurrentTimeTool);
    registry
}

/// Echoes its input back.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "echo",
            "Echo the given text back",
            json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to echo"
                    }
                },
                "required": ["text"]
            }),
        )
    }

    async fn call(&self, args: Arguments) -> Result<Vec<ContentItem>, ToolFailure> {
        let text = args.string_or("text", "");
        Ok(vec![ContentItem::text(format!("echo: {}", text))])
    }
}

/// Echoes its input back as several content items.
pub struct EchoRepeatTool;

#[async_trait]
impl Tool for EchoRepeatTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "echo_repeat",
            "Echo the given text back as several content items",
            json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to echo"
                    },
                    "count": {
                        "type": "integer",
                        "minimum": MIN_REPEAT,
                        "maximum": MAX_REPEAT,
                        "description": "Number of content items to return (clamped to 1-5)"
                    }
                },
                "required": ["text"]
            }),
        )
    }

    async fn call(&self, args: Arguments) -> Result<Vec<ContentItem>, ToolFailure> {
        let text = args.string_or("text", "");
        let count = args
            .integer_or("count", MIN_REPEAT)
            .clamp(MIN_REPEAT, MAX_REPEAT);
        Ok((1..=count)
            .map(|i| ContentItem::text(format!("echo {}/{}: {}", i, count, text)))
            .collect())
    }
}

/// Adds two numbers.
pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "add",
            "Add two numbers",
            json!({
                "type": "object",
                "properties": {
                    "a": { "type": "number" },
                    "b": { "type": "number" }
                },
                "required": ["a", "b"]
            }),
        )
    }

    async fn call(&self, args: Arguments) -> Result<Vec<ContentItem>, ToolFailure> {
        let sum = args.number_or("a", 0.0) + args.number_or("b", 0.0);
        if !sum.is_finite() {
            return Err(ToolFailure::execution("Result is not a finite number"));
        }
        Ok(vec![ContentItem::text(sum.to_string())])
    }
}

/// Reports the server's current time.
pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            "current_time",
            "Current server time in UTC (RFC 3339)",
            json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        )
    }

    async fn call(&self, _args: Arguments) -> Result<Vec<ContentItem>, ToolFailure> {
        Ok(vec![ContentItem::text(chrono::Utc::now().to_rfc3339())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    async fn call(tool: &dyn Tool, args: Value) -> Vec<ContentItem> {
        tool.call(Arguments::from_value(Some(args))).await.unwrap()
    }

    #[tokio::test]
    async fn test_echo() {
        let content = call(&EchoTool, json!({"text": "hi"})).await;
        assert_eq!(content, vec![ContentItem::text("echo: hi")]);
    }

    #[tokio::test]
    async fn test_repeat_is_clamped() {
        let tool = EchoRepeatTool;
        assert_eq!(call(&tool, json!({"text": "x", "count": 0})).await.len(), 1);
        assert_eq!(call(&tool, json!({"text": "x", "count": 9})).await.len(), 5);
        assert_eq!(call(&tool, json!({"text": "x", "count": 3})).await.len(), 3);
        assert_eq!(call(&tool, json!({"text": "x", "count": -4})).await.len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_defaults_bad_count() {
        let content = call(&EchoRepeatTool, json!({"text": "x", "count": "lots"})).await;
        assert_eq!(content, vec![ContentItem::text("echo 1/1: x")]);
    }

    #[tokio::test]
    async fn test_add_coerces_strings() {
        let content = call(&AddTool, json!({"a": "2", "b": 3})).await;
        assert_eq!(content, vec![ContentItem::text("5")]);
        let content = call(&AddTool, json!({"a": 0.5})).await;
        assert_eq!(content, vec![ContentItem::text("0.5")]);
    }

    #[tokio::test]
    async fn test_current_time_is_rfc3339() {
        let content = call(&CurrentTimeTool, json!({})).await;
        let text = content[0].as_text().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(text).is_ok());
    }
}
