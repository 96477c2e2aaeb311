//! Shared wire types for the brygga MCP tool server.
//!
//! This crate contains the JSON-RPC envelope, tool descriptors, content
//! items and stream event shapes shared between the server and its tests.

/// Default port for the brygga server.
pub const DEFAULT_PORT: u16 = 8787;

/// Path of the stream endpoint; POSTs to the same path carry client messages.
pub const SSE_PATH: &str = "/sse";

pub mod content;
pub mod events;
pub mod jsonrpc;
pub mod tool;

// Re-export commonly used types
pub use content::{CallToolResult, ContentItem};
pub use events::StreamEvent;
pub use jsonrpc::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
pub use tool::ToolDescriptor;
