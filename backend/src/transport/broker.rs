//! Session broker.
//!
//! Tracks streaming channels from the moment their stream opens until the
//! connection closes. A fresh channel is *staged*: it exists but no POST has
//! quoted its session id yet. The first POST quoting an unknown session id
//! *promotes* a staged channel and binds it to that id; later POSTs with the
//! same id reuse the binding.
//!
//! Promotion prefers the staged channel whose own announced id equals the
//! quoted id. Clients that quote an id the server never announced get the
//! most recently staged channel instead, which is only correct when streams
//! are set up one at a time.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{ChannelId, Result, Transport, TransportError, TRANSPORT_API_VERSION};

/// Outcome of [`SessionBroker::resolve`].
#[derive(Debug)]
pub enum Resolution<T> {
    /// The session id was already bound to this channel.
    Reused(Arc<T>),
    /// A staged channel was bound to the session id by this call.
    Promoted(Arc<T>),
    /// No session id given; the most recent channel was picked without binding.
    Fallback(Arc<T>),
    /// No channel is available.
    Unavailable,
}

impl<T> Resolution<T> {
    /// The resolved channel, if any.
    pub fn channel(&self) -> Option<&Arc<T>> {
        match self {
            Resolution::Reused(ch) | Resolution::Promoted(ch) | Resolution::Fallback(ch) => {
                Some(ch)
            }
            Resolution::Unavailable => None,
        }
    }

    /// Consume the resolution, returning the channel if any.
    pub fn into_channel(self) -> Option<Arc<T>> {
        match self {
            Resolution::Reused(ch) | Resolution::Promoted(ch) | Resolution::Fallback(ch) => {
                Some(ch)
            }
            Resolution::Unavailable => None,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Resolution::Reused(_) => "reused",
            Resolution::Promoted(_) => "promoted",
            Resolution::Fallback(_) => "fallback",
            Resolution::Unavailable => "unavailable",
        }
    }
}

/// Point-in-time counts of broker state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Channels waiting for their first POST
    pub staged: usize,
    /// Channels bound to a session id
    pub bound: usize,
}

struct BoundChannel<T> {
    channel: Arc<T>,
    /// Promotion order, used to find the most recently bound channel
    seq: u64,
}

struct BrokerState<T> {
    /// Staged channels in registration order; the last one is the most recent
    staged: Vec<Arc<T>>,
    bound: HashMap<String, BoundChannel<T>>,
    next_seq: u64,
}

/// Owns the staged stack and the session id to channel mapping.
///
/// All operations take a single lock, so no caller ever observes a partially
/// applied promotion.
pub struct SessionBroker<T> {
    state: Mutex<BrokerState<T>>,
}

impl<T: Transport> SessionBroker<T> {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrokerState {
                staged: Vec::new(),
                bound: HashMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Stage a freshly opened channel.
    ///
    /// Channels built against another version of the [`Transport`] interface
    /// are refused and never staged.
    pub fn register_staged(&self, channel: Arc<T>) -> Result<()> {
        let version = channel.api_version();
        if version != TRANSPORT_API_VERSION {
            warn!(
                "Refusing channel {}: transport interface v{}, broker speaks v{}",
                channel.id(),
                version,
                TRANSPORT_API_VERSION
            );
            return Err(TransportError::UnsupportedVersion {
                found: version,
                expected: TRANSPORT_API_VERSION,
            });
        }

        let mut state = self.state.lock();
        info!(
            "Staged channel {} (announced session {}, {} staged)",
            channel.id(),
            channel.session_id(),
            state.staged.len() + 1
        );
        state.staged.push(channel);
        Ok(())
    }

    /// Find the channel a message should be delivered to.
    pub fn resolve(&self, session_id: Option<&str>) -> Resolution<T> {
        let mut state = self.state.lock();

        let Some(session_id) = session_id else {
            return match Self::most_recent(&state) {
                Some(channel) => {
                    debug!("No session id given, falling back to {}", channel.id());
                    Resolution::Fallback(channel)
                }
                None => Resolution::Unavailable,
            };
        };

        if let Some(bound) = state.bound.get(session_id) {
            return Resolution::Reused(bound.channel.clone());
        }

        let position = state
            .staged
            .iter()
            .position(|ch| ch.session_id() == session_id)
            .or_else(|| state.staged.len().checked_sub(1));
        let Some(position) = position else {
            return Resolution::Unavailable;
        };

        let channel = state.staged.remove(position);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.bound.insert(
            session_id.to_string(),
            BoundChannel {
                channel: channel.clone(),
                seq,
            },
        );
        info!("Bound session {} to channel {}", session_id, channel.id());
        Resolution::Promoted(channel)
    }

    /// Forget a channel, wherever it is. Unknown ids are ignored.
    ///
    /// Returns `true` if the channel was staged or bound.
    pub fn unregister(&self, id: ChannelId) -> bool {
        let mut state = self.state.lock();

        if let Some(position) = state.staged.iter().position(|ch| ch.id() == id) {
            state.staged.remove(position);
            info!("Unregistered staged channel {}", id);
            return true;
        }

        let session_id = state
            .bound
            .iter()
            .find(|(_, bound)| bound.channel.id() == id)
            .map(|(sid, _)| sid.clone());
        match session_id {
            Some(sid) => {
                state.bound.remove(&sid);
                info!("Unregistered channel {} (session {})", id, sid);
                true
            }
            None => {
                debug!("Channel {} was not registered", id);
                false
            }
        }
    }

    /// Whether a session id is currently bound.
    pub fn is_bound(&self, session_id: &str) -> bool {
        self.state.lock().bound.contains_key(session_id)
    }

    /// Current staged/bound counts.
    pub fn stats(&self) -> BrokerStats {
        let state = self.state.lock();
        BrokerStats {
            staged: state.staged.len(),
            bound: state.bound.len(),
        }
    }

    fn most_recent(state: &BrokerState<T>) -> Option<Arc<T>> {
        state.staged.last().cloned().or_else(|| {
            state
                .bound
                .values()
                .max_by_key(|bound| bound.seq)
                .map(|bound| bound.channel.clone())
        })
    }
}

impl<T: Transport> Default for SessionBroker<T> {
    fn default() -> Self {
        Self::new()
    }
}
