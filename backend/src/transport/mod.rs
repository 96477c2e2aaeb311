//! Streaming channel abstraction and the session broker.
//!
//! A client opens a long-lived event stream with `GET /sse` and sends its
//! messages with separate `POST /sse?sessionId=<id>` requests. Each stream is
//! backed by a [`Transport`] implementation; the [`SessionBroker`] matches the
//! independently arriving POSTs to the stream they belong to.

pub mod broker;
pub mod sse;

pub use broker::{BrokerStats, Resolution, SessionBroker};
pub use sse::{ChannelStream, SseChannel};

use async_trait::async_trait;
use brygga_types::StreamEvent;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Version of the [`Transport`] capability interface.
pub const TRANSPORT_API_VERSION: u32 = 1;

/// Process-unique identity of a streaming channel.
///
/// Distinct from the session id: a channel has an identity before the broker
/// has bound it to any session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocate the next channel id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ChannelId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

/// Callback run once when a channel's connection closes.
pub type CloseHook = Box<dyn FnOnce(ChannelId) + Send>;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("outbound queue full")]
    QueueFull,

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported transport interface version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Capability interface every streaming channel implements (version 1).
///
/// The broker only relies on identity ([`Transport::id`],
/// [`Transport::session_id`]) and refuses channels whose
/// [`Transport::api_version`] differs from [`TRANSPORT_API_VERSION`]; the
/// front door uses the delivery and close notification operations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Version of the capability interface this channel implements.
    fn api_version(&self) -> u32 {
        TRANSPORT_API_VERSION
    }

    /// Identity of this channel.
    fn id(&self) -> ChannelId;

    /// Session identifier this channel announced to its client.
    fn session_id(&self) -> &str;

    /// Whether the underlying connection has closed.
    fn is_closed(&self) -> bool;

    /// Push an event to the client.
    async fn send(&self, event: StreamEvent) -> Result<()>;

    /// Hand a raw inbound payload (a POST body) to this channel.
    async fn deliver(&self, payload: &[u8]) -> Result<()>;

    /// Register a callback for when the connection closes.
    ///
    /// Runs immediately if the channel is already closed.
    fn on_close(&self, hook: CloseHook);
}
