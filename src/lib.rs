//! kube-message: a minimal message service packaged for Kubernetes.
//!
//! Serves a fixed confirmation string on `GET /message` and a health probe on
//! `GET /health`, and renders the Deployment and NodePort Service that run it.

pub mod config;
pub mod error;
pub mod http;
pub mod manifest;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
