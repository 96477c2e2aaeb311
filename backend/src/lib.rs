//! brygga library.
//!
//! Serves a small MCP tool catalog over the HTTP+SSE two-channel transport.
//! This module exposes the application builder for use in tests.

use axum::{
    routing::{get, MethodRouter},
    Router,
};
use brygga_types::SSE_PATH;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod mcp;
pub mod state;
pub mod tools;
pub mod transport;

use state::AppState;

/// Create the Axum application router with the built-in tools.
///
/// This function is used both by the main server binary and by integration tests.
pub async fn create_app() -> Router {
    create_app_with_state(AppState::default()).await
}

/// Create the Axum application router with a given state.
pub async fn create_app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::health::health).fallback(api::not_found))
        .route("/health", get(api::health::health).fallback(api::not_found))
        .route(SSE_PATH, sse_routes())
        .route("/sse/{*rest}", sse_routes())
        .fallback(api::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the application until `signal` resolves.
///
/// Open event streams are ended as soon as the signal fires; otherwise
/// graceful shutdown would wait for every client to disconnect on its own.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    state: AppState,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app_with_state(state.clone()).await;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            state.begin_shutdown();
        })
        .await
}

/// Method table shared by `/sse` and everything below it.
fn sse_routes() -> MethodRouter<AppState> {
    get(api::sse::open_stream)
        .post(api::sse::post_message)
        .head(api::sse::stream_head)
        .options(api::sse::preflight)
        .fallback(api::not_found)
}
