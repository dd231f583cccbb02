//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::AppConfig;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// The message payload is fixed when the state is built and shared read-only
/// by every request, so concurrent handlers never coordinate.
#[derive(Clone)]
pub struct AppState {
    pub message: Arc<str>,
}

impl AppState {
    /// Creates application state from the loaded configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            message: Arc::from(config.message.body.as_str()),
        }
    }
}
