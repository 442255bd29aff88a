use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tokio::sync::Semaphore;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Reuses the caller's `x-request-id` or generates a `UUIDv4`, exposes it to
/// handlers as [`RequestId`] and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

/// Caps the number of requests being handled at once across the server.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimitState {
    permits: Arc<Semaphore>,
}

impl ConcurrencyLimitState {
    #[must_use]
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Waits for a free slot before running the request; the slot is released
/// when the response has been produced.
pub async fn enforce_concurrency_limit(
    State(limit): State<ConcurrencyLimitState>,
    req: Request,
    next: Next,
) -> Response {
    // The semaphore is never closed, so acquisition only fails if that changes.
    let _permit = match Arc::clone(&limit.permits).acquire_owned().await {
        Ok(permit) => Some(permit),
        Err(e) => {
            tracing::error!(error = %e, "concurrency limiter closed");
            None
        }
    };
    next.run(req).await
}
