//! API handlers.

pub mod health;
pub mod sse;

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use brygga_types::SSE_PATH;

use crate::state::AppState;

/// Body of every 404 response.
pub const NOT_FOUND_MESSAGE: &str = "Not found";

/// Unknown method or path.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response()
}

/// Router fallback. Stream endpoints (`/sse/`, `/ssex`, ...) and health
/// checks (`/healthz`, `/health/live`, ...) are matched by prefix; everything
/// else is a 404.
pub async fn fallback(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path();
    let is_stream = path.starts_with(SSE_PATH);
    let is_health = path.starts_with("/health");

    if is_stream {
        return sse::dispatch(state, request).await;
    }
    if is_health && request.method() == Method::GET {
        return health::health().await.into_response();
    }
    not_found().await
}
