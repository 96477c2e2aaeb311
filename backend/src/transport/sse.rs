//! Server-sent event channel.
//!
//! One [`SseChannel`] exists per open `GET /sse` request. The HTTP response
//! body is a [`ChannelStream`]; when the client goes away the body is dropped,
//! which closes the channel and runs its close hooks.

use async_trait::async_trait;
use brygga_types::{JsonRpcMessage, StreamEvent};
use futures::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChannelId, CloseHook, Result, Transport, TransportError};
use crate::mcp::McpHandler;

/// A streaming channel backed by an SSE response body.
pub struct SseChannel {
    id: ChannelId,
    session_id: String,
    outbound: mpsc::Sender<StreamEvent>,
    handler: McpHandler,
    closed: AtomicBool,
    close_hooks: Mutex<Vec<CloseHook>>,
}

impl SseChannel {
    /// Open a channel and the stream that feeds its HTTP response.
    ///
    /// The session id is minted here and queued as the first `endpoint`
    /// event, pointing the client at `endpoint?sessionId=<id>`.
    pub fn open(
        handler: McpHandler,
        endpoint: &str,
        capacity: usize,
    ) -> Result<(Arc<Self>, ChannelStream)> {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let session_id = Uuid::new_v4().to_string();

        outbound
            .try_send(StreamEvent::Endpoint {
                uri: format!("{}?sessionId={}", endpoint, session_id),
            })
            .map_err(|_| TransportError::Closed)?;

        let channel = Arc::new(Self {
            id: ChannelId::next(),
            session_id,
            outbound,
            handler,
            closed: AtomicBool::new(false),
            close_hooks: Mutex::new(Vec::new()),
        });
        debug!(
            "Opened channel {} for session {}",
            channel.id, channel.session_id
        );

        let stream = ChannelStream {
            events: ReceiverStream::new(rx),
            channel: channel.clone(),
        };
        Ok((channel, stream))
    }

    /// Mark the channel closed and run its close hooks. Only the first call
    /// has any effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Channel {} closed", self.id);
        let hooks = std::mem::take(&mut *self.close_hooks.lock());
        for hook in hooks {
            hook(self.id);
        }
    }

    /// Queue every event or none of them.
    fn send_all(&self, events: Vec<StreamEvent>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let permits = self
            .outbound
            .try_reserve_many(events.len())
            .map_err(queue_error)?;
        for (permit, event) in permits.zip(events) {
            debug!("Channel {}: {}", self.id, event.description());
            permit.send(event);
        }
        Ok(())
    }
}

fn queue_error<T>(e: mpsc::error::TrySendError<T>) -> TransportError {
    match e {
        mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
        mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
    }
}

#[async_trait]
impl Transport for SseChannel {
    fn id(&self) -> ChannelId {
        self.id
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn send(&self, event: StreamEvent) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        debug!("Channel {}: {}", self.id, event.description());
        self.outbound.try_send(event).map_err(queue_error)
    }

    /// Parse a POST body (one JSON-RPC message or a batch) and push every
    /// response it produces onto the stream.
    ///
    /// All responses of a batch are queued together: if the queue cannot take
    /// all of them, none is sent and the call fails with `QueueFull`.
    async fn deliver(&self, payload: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| TransportError::InvalidMessage(e.to_string()))?;
        let items = match value {
            Value::Array(items) if items.is_empty() => {
                return Err(TransportError::InvalidMessage("empty batch".to_string()));
            }
            Value::Array(items) => items,
            other => vec![other],
        };
        let messages = items
            .into_iter()
            .map(serde_json::from_value::<JsonRpcMessage>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TransportError::InvalidMessage(e.to_string()))?;

        let mut events = Vec::new();
        for message in messages {
            match message {
                JsonRpcMessage::Request(request) => {
                    if let Some(response) = self.handler.handle_request(request).await {
                        events.push(StreamEvent::Message {
                            json: serde_json::to_string(&response)?,
                        });
                    }
                }
                JsonRpcMessage::Response(response) => {
                    debug!(
                        "Channel {}: ignoring client response (id={:?})",
                        self.id, response.id
                    );
                }
            }
        }
        self.send_all(events)
    }

    fn on_close(&self, hook: CloseHook) {
        let mut hooks = self.close_hooks.lock();
        if self.is_closed() {
            drop(hooks);
            hook(self.id);
            return;
        }
        hooks.push(hook);
    }
}

/// Event stream backing one SSE response. Dropping it closes the channel.
pub struct ChannelStream {
    events: ReceiverStream<StreamEvent>,
    channel: Arc<SseChannel>,
}

impl Stream for ChannelStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        if !self.channel.is_closed() {
            info!(
                "Stream for session {} ended, closing channel {}",
                self.channel.session_id, self.channel.id
            );
        }
        self.channel.close();
    }
}
