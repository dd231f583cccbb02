//! HTTP route handlers.
//!
//! The message route carries a Cache-Control header since its payload is fixed
//! for the life of the process. The health route is never cached so probes
//! always reach the pod. Unknown paths fall through to a plain-text 404.
//!
//! Request tracing is enabled via middleware that assigns a request ID to
//! each incoming request, allowing correlation of all logs within a request.

pub mod health;
pub mod message;

use axum::{middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::{catch_panic::CatchPanicLayer, set_header::SetResponseHeaderLayer};

use crate::config::{CACHE_CONTROL_MESSAGE, HEALTH_PATH, MESSAGE_PATH};
use crate::error::{not_found, panic_response};
use crate::middleware::request_id_layer;
use crate::state::AppState;

/// Creates the Axum router with all routes and cache headers.
pub fn create_router(state: AppState) -> Router {
    let message_routes = Router::new()
        .route(MESSAGE_PATH, get(message::message))
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_MESSAGE),
        ));

    // Health check - no caching, always fresh for liveness probes
    let health_routes = Router::new().route(HEALTH_PATH, get(health::health));

    let router = Router::new()
        .merge(message_routes)
        .merge(health_routes)
        .fallback(not_found)
        .with_state(state);

    with_request_layers(router)
}

/// Wraps a router in the layers every response goes through.
fn with_request_layers(router: Router) -> Router {
    router
        // A panicking handler answers 500 instead of dropping the connection
        .layer(CatchPanicLayer::custom(panic_response))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
