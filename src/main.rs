//! kube-message: application entry point.
//!
//! Parses the command line, loads configuration from TOML, initializes
//! tracing, then either serves HTTP or prints the Kubernetes manifests for the
//! loaded configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kube_message::config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER};
use kube_message::http::start_server;
use kube_message::manifest::ManifestSet;
use kube_message::{create_router, AppState};

/// kube-message: a minimal message service for Kubernetes
#[derive(Parser, Debug)]
#[command(name = "kube-message", version, about)]
struct Args {
    /// Path to configuration file (defaults to config/default.toml when present)
    #[arg(short, long, env = "CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "kube_message=debug,tower_http=info")
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (the default)
    Serve,
    /// Render the Deployment and Service manifests as JSON
    Manifests {
        /// Write deployment.json and service.json here instead of printing a List
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = AppConfig::load_or_default(args.config.as_deref())?;

    init_tracing(args.log_level, config.logging.format);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Manifests { output } => manifests(&config, output),
    }
}

/// Log filter priority: CLI > RUST_LOG > default. Logs go to stderr so
/// rendered manifests on stdout stay clean.
fn init_tracing(log_level: Option<String>, format: LogFormat) {
    let log_filter = log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry = tracing_subscriber::registry().with(EnvFilter::new(&log_filter));

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        host = %config.http.host,
        port = config.http.port,
        message_bytes = config.message.body.len(),
        log_format = ?config.logging.format,
        "Loaded configuration"
    );

    let app = create_router(AppState::new(&config));

    start_server(app, &config.http).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn manifests(config: &AppConfig, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let manifests = ManifestSet::from_config(config);
    manifests.validate()?;

    match output {
        Some(dir) => {
            for path in manifests.write_dir(&dir)? {
                tracing::info!(path = %path.display(), "Wrote manifest");
            }
        }
        None => println!("{}", manifests.to_list_json()?),
    }

    Ok(())
}
