//! MCP (Model Context Protocol) request handling.
//!
//! Messages reach the handler through a streaming channel's inbound path;
//! its responses are pushed back out over the same stream.

pub mod handler;

pub use handler::McpHandler;
