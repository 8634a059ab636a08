use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use floodgate::admission::AdmissionLimiter;
use floodgate::config::FloodgateConfig;
use floodgate::http::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "floodgate")]
#[command(about = "Sliding-window request admission service", version)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address from the configuration
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    info!("Starting Floodgate Admission Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration; environment overrides beat the file
    let mut config = match &args.config {
        Some(path) => FloodgateConfig::from_file(path)?,
        None => FloodgateConfig::default(),
    };
    config.apply_env_overrides()?;
    if let Some(addr) = args.listen {
        config.server.listen_addr = addr;
    }
    config.validate()?;

    info!(
        listen_addr = %config.server.listen_addr,
        requests_per_window = config.admission.requests_per_window,
        window_seconds = config.admission.window_seconds,
        "Configuration loaded"
    );

    // Initialize the admission limiter
    let limiter = Arc::new(AdmissionLimiter::new(
        config.admission.requests_per_window,
        config.admission.window_seconds,
        config.admission.cleanup_interval_seconds,
    ));
    info!("Admission limiter initialized");

    // Create and start the HTTP server
    let server = HttpServer::new(
        config.server.listen_addr,
        limiter,
        config.admission.exempt_paths.clone(),
    );

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Floodgate Admission Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
