//! Server-sent event endpoints.
//!
//! ## Endpoints
//!
//! - `GET /sse` - Open a stream; the first event names the session id
//! - `POST /sse?sessionId=<id>` - Deliver a JSON-RPC message to that stream
//! - `HEAD /sse` - Stream headers only
//! - `OPTIONS /sse` - Permissive cross-origin preflight
//!
//! Every path starting with `/sse` (`/sse/`, `/sse/messages`, ...) is served
//! the same way.
//!
//! Responses to POSTed messages travel over the stream, never in the POST
//! response itself.

use axum::{
    body::Bytes,
    extract::{Query, Request, State},
    handler::Handler,
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use brygga_types::SSE_PATH;
use futures::StreamExt;
use std::convert::Infallible;
use tracing::{debug, error, info, warn};

use crate::state::AppState;
use crate::transport::{SseChannel, Transport, TransportError};

/// Body of the 409 returned when no stream can take a message.
pub const NO_TRANSPORT_MESSAGE: &str = "No active transport. Open GET /sse first.";

/// Body of a successful POST.
pub const ACCEPTED_MESSAGE: &str = "Accepted";

/// Query parameter naming the session a POST belongs to.
pub const SESSION_ID_PARAM: &str = "sessionId";

/// First `sessionId` in the query string. Repeats are ignored and an empty
/// value counts as absent.
fn session_id_param(params: Vec<(String, String)>) -> Option<String> {
    params
        .into_iter()
        .find(|(key, _)| key == SESSION_ID_PARAM)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Serve an `/sse`-prefixed path the router has no explicit route for.
pub async fn dispatch(state: AppState, request: Request) -> Response {
    match *request.method() {
        Method::GET => Handler::<_, AppState>::call(open_stream, request, state).await,
        Method::POST => Handler::<_, AppState>::call(post_message, request, state).await,
        Method::HEAD => stream_head().await,
        Method::OPTIONS => preflight().await,
        _ => super::not_found().await,
    }
}

/// GET /sse - Open a stream.
///
/// The channel is staged with the broker before the response is returned and
/// unregistered when the response body is dropped. The stream ends on server
/// shutdown so that graceful shutdown does not wait for clients to leave.
pub async fn open_stream(State(state): State<AppState>) -> Response {
    let settings = state.sse();
    let (channel, stream) = match SseChannel::open(
        state.mcp_handler().clone(),
        SSE_PATH,
        settings.channel_capacity,
    ) {
        Ok(opened) => opened,
        Err(e) => {
            error!("Failed to open stream: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to open stream: {}", e),
            )
                .into_response();
        }
    };

    if let Err(e) = state.broker().register_staged(channel.clone()) {
        error!("Failed to stage channel {}: {}", channel.id(), e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to open stream: {}", e),
        )
            .into_response();
    }
    let lifecycle_state = state.clone();
    channel.on_close(Box::new(move |id| {
        lifecycle_state.broker().unregister(id);
    }));
    info!(
        "SSE stream opened: channel {} (session {})",
        channel.id(),
        channel.session_id()
    );

    let events = stream
        .take_until(state.shutdown_signal())
        .map(|event| {
            Ok::<_, Infallible>(Event::default().event(event.name()).data(event.data()))
        });

    Sse::new(events)
        .keep_alive(
            KeepAlive::new()
                .interval(settings.keep_alive)
                .text("keep-alive"),
        )
        .into_response()
}

/// POST /sse - Deliver a client message to its stream.
pub async fn post_message(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let session_id = session_id_param(params);
    let resolution = state.broker().resolve(session_id.as_deref());
    debug!(
        "POST {}: session={:?} resolution={}",
        SSE_PATH,
        session_id,
        resolution.kind()
    );

    let Some(channel) = resolution.into_channel() else {
        warn!("No active transport for session {:?}", session_id);
        return (StatusCode::CONFLICT, NO_TRANSPORT_MESSAGE).into_response();
    };

    match channel.deliver(&body).await {
        Ok(()) => (StatusCode::OK, ACCEPTED_MESSAGE).into_response(),
        Err(e) => delivery_error(&channel, e),
    }
}

fn delivery_error(channel: &SseChannel, e: TransportError) -> Response {
    match e {
        TransportError::InvalidMessage(ref reason) => {
            warn!(
                "Rejected message for session {}: {}",
                channel.session_id(),
                reason
            );
            (StatusCode::BAD_REQUEST, "Invalid message").into_response()
        }
        other => {
            error!(
                "Delivery to session {} failed: {}",
                channel.session_id(),
                other
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Delivery failed: {}", other),
            )
                .into_response()
        }
    }
}

/// HEAD /sse - Stream headers without opening a stream.
pub async fn stream_head() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
            (header::CONNECTION, "keep-alive"),
        ],
    )
        .into_response()
}

/// OPTIONS /sse - Cross-origin preflight.
pub async fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET,POST,OPTIONS,HEAD"),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                "content-type, authorization",
            ),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_session_id_param() {
        assert_eq!(session_id_param(params(&[])), None);
        assert_eq!(
            session_id_param(params(&[("sessionId", "A")])),
            Some("A".to_string())
        );
        assert_eq!(session_id_param(params(&[("sessionId", "")])), None);
        assert_eq!(
            session_id_param(params(&[("other", "x"), ("sessionId", "a"), ("sessionId", "b")])),
            Some("a".to_string())
        );
    }
}
