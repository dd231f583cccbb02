//! The message endpoint.

use axum::extract::State;
use tracing::instrument;

use crate::state::AppState;

/// Returns the configured confirmation string verbatim.
///
/// Takes no input: query strings, headers and bodies are ignored. axum sets
/// `text/plain; charset=utf-8` for `String` bodies.
#[instrument(name = "message::message", skip(state))]
pub async fn message(State(state): State<AppState>) -> String {
    tracing::debug!(bytes = state.message.len(), "Serving message");
    state.message.to_string()
}
