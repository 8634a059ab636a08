//! Admission and request-tracking middleware.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::admission::{AdmissionLimiter, ClientKey, Decision};

/// Shared state handed to the admission middleware.
pub struct AppState {
    /// The limiter instance
    pub limiter: Arc<AdmissionLimiter>,
    /// Paths that bypass admission control entirely
    pub exempt_paths: Vec<String>,
}

/// Derive the client key from request metadata.
///
/// Preference order: first entry of `X-Forwarded-For`, then `X-Real-IP`,
/// then the transport peer address, else the sentinel key. The forwarded
/// chain is trusted as-is; spoofing resistance is a deployment concern.
pub fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> ClientKey {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            if !first.trim().is_empty() {
                return ClientKey::new(first);
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.trim().is_empty() {
            return ClientKey::new(real_ip);
        }
    }

    match peer {
        Some(ip) => ClientKey::new(ip.to_string()),
        None => ClientKey::unknown(),
    }
}

/// Current wall-clock time as unix seconds.
fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Admission control middleware.
///
/// Exempt paths bypass the limiter entirely: they are never rejected and
/// never consume budget from any client's window. All other requests are
/// admitted or rejected per the limiter's decision; both outcomes carry the
/// `X-RateLimit-*` headers, and rejections return 429 with retry guidance.
pub async fn admission_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if state.exempt_paths.iter().any(|p| p == &path) {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let key = client_key(request.headers(), peer);

    let decision = state.limiter.admit(&key, unix_now());
    match decision {
        Decision::Admitted { .. } => {
            let mut response = next.run(request).await;
            apply_rate_limit_headers(response.headers_mut(), &decision);
            response
        }
        Decision::Rejected { retry_after, .. } => {
            warn!(
                client = %key,
                path = %path,
                "Rate limit exceeded"
            );
            rejected_response(&decision, retry_after)
        }
    }
}

/// Build the 429 response for a rejected request.
fn rejected_response(decision: &Decision, retry_after: u64) -> Response {
    let body = Json(serde_json::json!({
        "error": "Rate limit exceeded",
        "message": format!(
            "Too many requests. Limit: {} per {} seconds",
            decision.limit(),
            retry_after
        ),
        "retry_after": retry_after,
    }));

    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    apply_rate_limit_headers(headers, decision);
    response
}

/// Attach the `X-RateLimit-*` headers from a decision.
fn apply_rate_limit_headers(headers: &mut HeaderMap, decision: &Decision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit()));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining()));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_at()));
}

/// Request tracking middleware.
///
/// Assigns each request a UUID, echoes it back in the `x-request-id`
/// response header, and logs completion with method, path, status, and
/// duration.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
