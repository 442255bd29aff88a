mod query;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use spaces_core::{
    Message, ProximityQueryService, QueryFailure, SearchError, SearchParameters,
    SpatialQueryEngine, DEFAULT_RESULT_LIMIT,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_concurrency_limit, request_id, ConcurrencyLimitState, RequestId, REQUEST_ID_HEADER,
};

const MAX_RESULT_LIMIT: u32 = 500;

pub struct AppState<E> {
    pub service: Arc<ProximityQueryService<E>>,
    pub result_limit: u32,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            result_limit: self.result_limit,
        }
    }
}

impl<E: SpatialQueryEngine> AppState<E> {
    pub fn new(engine: E, params: SearchParameters) -> Self {
        Self {
            service: Arc::new(ProximityQueryService::new(engine, params)),
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }

    #[must_use]
    pub fn with_result_limit(mut self, limit: u32) -> Self {
        self.result_limit = limit;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn validation(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(request_id, "validation_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "dependency_error" => StatusCode::BAD_GATEWAY,
            "timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Applies the configured default and clamps to `1..=MAX_RESULT_LIMIT`.
pub(super) fn normalize_limit(limit: Option<i64>, default: u32) -> u32 {
    let clamped = limit
        .unwrap_or_else(|| i64::from(default))
        .clamp(1, i64::from(MAX_RESULT_LIMIT));
    u32::try_from(clamped).unwrap_or(MAX_RESULT_LIMIT)
}

pub(super) fn map_search_error(request_id: String, error: &SearchError) -> ApiError {
    match error {
        SearchError::Configuration(e) => ApiError::validation(request_id, e.to_string()),
        SearchError::Geometry(e) => ApiError::validation(request_id, e.to_string()),
        SearchError::Query(QueryFailure::Timeout(after)) => {
            tracing::error!(?after, "spatial query timed out");
            ApiError::new(request_id, "timeout", "spatial query timed out")
        }
        SearchError::Query(e @ QueryFailure::Backend(_)) => {
            tracing::error!(error = %e, "spatial query failed");
            ApiError::new(request_id, "dependency_error", "spatial query failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn build_app<E>(state: AppState<E>, max_concurrent_requests: usize) -> Router
where
    E: SpatialQueryEngine<Record = Message> + 'static,
{
    Router::new()
        .route("/api/v1/health", get(health::<E>))
        .route("/api/v1/query", get(query::query_messages::<E>))
        .route("/api/v1/query/area", post(query::query_area::<E>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    ConcurrencyLimitState::new(max_concurrent_requests),
                    enforce_concurrency_limit,
                ))
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health<E>(
    State(state): State<AppState<E>>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse
where
    E: SpatialQueryEngine<Record = Message> + 'static,
{
    let meta = ResponseMeta::new(req_id.0);

    match state.service.engine().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
