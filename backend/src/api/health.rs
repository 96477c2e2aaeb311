//! Health check endpoint.

/// Health check endpoint; no session state is touched.
pub async fn health() -> &'static str {
    "ok"
}
