//! Application state management.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::Config;
use crate::mcp::McpHandler;
use crate::tools::ToolDispatcher;
use crate::transport::{SessionBroker, SseChannel};

/// Per-stream settings taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SseSettings {
    pub keep_alive: Duration,
    pub channel_capacity: usize,
}

impl From<&Config> for SseSettings {
    fn from(config: &Config) -> Self {
        Self {
            keep_alive: config.keep_alive,
            channel_capacity: config.channel_capacity,
        }
    }
}

impl Default for SseSettings {
    fn default() -> Self {
        SseSettings::from(&Config::default())
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Staged and bound streaming channels
    broker: SessionBroker<SseChannel>,
    /// Handler given to every new channel
    mcp: McpHandler,
    sse: SseSettings,
    /// Flipped to `true` once the server starts shutting down
    shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Create application state around the given tool dispatcher.
    pub fn new(dispatcher: ToolDispatcher, sse: SseSettings) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(AppStateInner {
                broker: SessionBroker::new(),
                mcp: McpHandler::new(Arc::new(dispatcher)),
                sse,
                shutdown,
            }),
        }
    }

    /// Create application state with the built-in tools and configured stream settings.
    pub fn from_config(config: &Config) -> Self {
        Self::new(ToolDispatcher::with_builtin_tools(), SseSettings::from(config))
    }

    pub fn broker(&self) -> &SessionBroker<SseChannel> {
        &self.inner.broker
    }

    pub fn mcp_handler(&self) -> &McpHandler {
        &self.inner.mcp
    }

    pub fn sse(&self) -> SseSettings {
        self.inner.sse
    }

    /// Ask every open stream to end.
    pub fn begin_shutdown(&self) {
        self.inner.shutdown.send_replace(true);
    }

    /// Resolves once [`AppState::begin_shutdown`] has been called, including
    /// when that happened before this call.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.inner.shutdown.subscribe();
        async move {
            let stopping = rx.wait_for(|stopping| *stopping).await.is_ok();
            if !stopping {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ToolDispatcher::with_builtin_tools(), SseSettings::default())
    }
}
