//! HTTP surface: admission middleware, request tracking, and the server.

mod middleware;
mod server;

pub use middleware::{admission_middleware, client_key, track_requests, AppState};
pub use server::HttpServer;
