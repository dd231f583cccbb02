//! HTTP server module.
//!
//! Serves plain HTTP on the container port; TLS terminates outside the pod.
//! The server drains in-flight requests on SIGTERM/SIGINT, which is how
//! Kubernetes asks a pod to stop, and gives up after a bounded grace period.

mod server;
mod shutdown;

pub use server::{serve_with_shutdown, start_server, ServerError};
pub use shutdown::shutdown_signal;
