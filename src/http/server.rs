//! HTTP server startup logic.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::config::{ConfigError, HttpServerConfig};

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bind the configured address and serve until SIGTERM/SIGINT.
///
/// This function blocks until the server shuts down.
pub async fn start_server(app: Router, config: &HttpServerConfig) -> Result<(), ServerError> {
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(%addr, "Starting HTTP server");

    serve_with_shutdown(
        listener,
        app,
        shutdown::shutdown_signal(),
        Duration::from_secs(config.shutdown_grace_seconds),
    )
    .await
}

/// Serve `app` on an already bound listener until `signal` resolves.
///
/// Once the signal fires the listener stops accepting, and open connections
/// get up to `grace` to finish before the server returns anyway.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    grace: Duration,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (fired_tx, fired_rx) = oneshot::channel::<()>();

    let signal = async move {
        signal.await;
        let _ = fired_tx.send(());
    };

    let drain_deadline = async move {
        if fired_rx.await.is_err() {
            // Signal future dropped without firing: no deadline applies
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();

    tokio::select! {
        result = server => {
            result?;
            tracing::info!("Server stopped");
            Ok(())
        }
        _ = drain_deadline => {
            tracing::warn!(
                grace_seconds = grace.as_secs(),
                "Connections still open after grace period, stopping anyway"
            );
            Ok(())
        }
    }
}
