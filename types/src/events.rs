//! Events sent to clients over the server-sent event stream.

use serde::{Deserialize, Serialize};

/// Event types pushed over an open stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Where (and under which session id) the client must POST its messages.
    /// Always the first event on a stream.
    Endpoint { uri: String },
    /// A serialized JSON-RPC message.
    Message { json: String },
}

impl StreamEvent {
    /// SSE `event:` field for this event.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Endpoint { .. } => "endpoint",
            StreamEvent::Message { .. } => "message",
        }
    }

    /// SSE `data:` field for this event.
    pub fn data(&self) -> &str {
        match self {
            StreamEvent::Endpoint { uri } => uri,
            StreamEvent::Message { json } => json,
        }
    }

    /// Get a description of the event for logging.
    pub fn description(&self) -> String {
        match self {
            StreamEvent::Endpoint { uri } => format!("Endpoint announced: {}", uri),
            StreamEvent::Message { json } => format!("Message ({} bytes)", json.len()),
        }
    }
}
