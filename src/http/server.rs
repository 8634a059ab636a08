//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use tracing::{error, info};

use super::middleware::{admission_middleware, track_requests, AppState};
use crate::admission::AdmissionLimiter;
use crate::error::{FloodgateError, Result};

/// HTTP server for the admission service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The limiter instance
    limiter: Arc<AdmissionLimiter>,
    /// Paths that bypass admission control
    exempt_paths: Vec<String>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, limiter: Arc<AdmissionLimiter>, exempt_paths: Vec<String>) -> Self {
        Self {
            addr,
            limiter,
            exempt_paths,
        }
    }

    /// Build the router with the admission and tracking layers applied.
    ///
    /// Business routes mount behind the admission layer; the operational
    /// endpoints are registered here but bypass admission via the exempt
    /// list.
    fn router(&self) -> Router {
        let state = Arc::new(AppState {
            limiter: Arc::clone(&self.limiter),
            exempt_paths: self.exempt_paths.clone(),
        });

        Router::new()
            .route("/", get(index_handler))
            .route("/health", get(health_handler))
            .route("/health/detailed", get(detailed_health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&state),
                admission_middleware,
            ))
            .layer(middleware::from_fn(track_requests))
            .with_state(state)
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();

        info!(addr = %self.addr, "Starting HTTP server for admission service");

        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            FloodgateError::Io(e)
        })
    }
}

async fn index_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "floodgate",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn detailed_health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "admission": {
            "requests_per_window": state.limiter.limit(),
            "window_seconds": state.limiter.window_seconds(),
            "tracked_clients": state.limiter.client_count(),
        },
    }))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "tracked_clients": state.limiter.client_count(),
        "requests_per_window": state.limiter.limit(),
        "window_seconds": state.limiter.window_seconds(),
    }))
}
