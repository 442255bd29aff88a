use axum::body::{to_bytes, Body};
use axum::http::Request;
use chrono::{Duration, Utc};
use spaces_core::{
    FilterContext, GeoPoint, InMemoryEngine, OrderExpression, QueryFailure, SearchParameters,
};
use tower::ServiceExt;

use super::*;

fn message(id: i64, latitude: f64, longitude: f64, age_days: i64) -> Message {
    let created = Utc::now() - Duration::days(age_days);
    Message {
        id,
        version: 1,
        content: format!("I am message {id}"),
        location: GeoPoint::new(latitude, longitude).expect("valid point"),
        created_at: created,
        updated_at: created,
    }
}

/// 25 messages on a 0.1° grid centred on the origin; id 12 sits at (0, 0).
fn grid() -> Vec<Message> {
    let mut out = Vec::new();
    for i in 0..5_i32 {
        for j in 0..5_i32 {
            let id = i64::from(i * 5 + j);
            out.push(message(
                id,
                f64::from(i - 2) * 0.1,
                f64::from(j - 2) * 0.1,
                i64::from(i),
            ));
        }
    }
    out
}

fn memory_app() -> (Router, InMemoryEngine<Message>) {
    let engine = InMemoryEngine::new(grid());
    let state = AppState::new(engine.clone(), SearchParameters::default());
    (build_app(state, 8), engine)
}

/// Engine whose every call fails the same way.
#[derive(Clone, Copy)]
struct FailingEngine {
    timeout: bool,
}

impl FailingEngine {
    fn failure(self) -> QueryFailure {
        if self.timeout {
            QueryFailure::Timeout(std::time::Duration::from_millis(5))
        } else {
            QueryFailure::backend("connection refused")
        }
    }
}

impl SpatialQueryEngine for FailingEngine {
    type Record = Message;

    async fn count(&self, _filter: &FilterContext) -> Result<u64, QueryFailure> {
        Err(self.failure())
    }

    async fn fetch(
        &self,
        _filter: &FilterContext,
        _order: &OrderExpression,
        _limit: u32,
    ) -> Result<Vec<Message>, QueryFailure> {
        Err(self.failure())
    }

    async fn ping(&self) -> Result<(), QueryFailure> {
        Err(self.failure())
    }
}

fn failing_app(timeout: bool) -> Router {
    let state = AppState::new(FailingEngine { timeout }, SearchParameters::default());
    build_app(state, 8)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&body).expect("json parse"))
}

async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&body).expect("json parse"))
}

fn result_ids(json: &serde_json::Value) -> Vec<i64> {
    json["data"]["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|m| m["id"].as_i64().expect("id"))
        .collect()
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None, 50), 50);
    assert_eq!(normalize_limit(Some(0), 50), 1);
    assert_eq!(normalize_limit(Some(-4), 50), 1);
    assert_eq!(normalize_limit(Some(10_000), 50), MAX_RESULT_LIMIT);
    assert_eq!(normalize_limit(Some(25), 50), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("timeout", StatusCode::GATEWAY_TIMEOUT),
        ("dependency_error", StatusCode::BAD_GATEWAY),
        ("not_found", StatusCode::NOT_FOUND),
        ("anything_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = memory_app();
    let (status, json) = get_json(app, "/api/v1/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["database"], "ok");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn health_reports_degraded_when_ping_fails() {
    let (status, json) = get_json(failing_app(false), "/api/v1/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["data"]["status"], "degraded");
}

#[tokio::test]
async fn query_with_distance_returns_nearby_messages() {
    let (app, engine) = memory_app();
    let (status, json) = get_json(app, "/api/v1/query?latitude=0&longitude=0&distance=12000").await;

    assert_eq!(status, StatusCode::OK);
    let ids = result_ids(&json);
    assert_eq!(ids.len(), 5);
    assert_eq!(ids[0], 12);
    assert_eq!(json["data"]["distance"].as_f64(), Some(12_000.0));
    assert_eq!(engine.count_calls(), 0);
}

#[tokio::test]
async fn query_without_distance_searches_for_radius() {
    let (app, engine) = memory_app();
    let (status, json) = get_json(app, "/api/v1/query?latitude=0&longitude=0").await;

    assert_eq!(status, StatusCode::OK);
    assert!(engine.count_calls() > 0);
    // 25 messages never reach the default band, so the search widens to the
    // largest allowed radius and everything comes back.
    assert_eq!(result_ids(&json).len(), 25);
    let distance = json["data"]["distance"].as_f64().expect("distance");
    assert!((distance - 6_175_000.0).abs() < 1.0, "got {distance}");
}

#[tokio::test]
async fn zero_distance_is_treated_as_unset() {
    let (app, engine) = memory_app();
    let (status, _) = get_json(app, "/api/v1/query?latitude=0&longitude=0&distance=0").await;

    assert_eq!(status, StatusCode::OK);
    assert!(engine.count_calls() > 0);
}

#[tokio::test]
async fn query_honours_limit_and_recent_order() {
    let (app, _) = memory_app();
    let (status, json) = get_json(
        app,
        "/api/v1/query?latitude=0&longitude=0&distance=100000&limit=3&order=recent",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = json["data"]["results"].as_array().expect("results");
    assert_eq!(results.len(), 3);
    // Row i = 0 of the grid is the newest.
    assert!(result_ids(&json).iter().all(|id| *id < 5));
}

#[tokio::test]
async fn query_since_filters_old_messages() {
    let (app, _) = memory_app();
    let since = (Utc::now() - Duration::hours(36)).format("%Y-%m-%dT%H:%M:%SZ");
    let uri = format!("/api/v1/query?latitude=0&longitude=0&distance=100000&since={since}");
    let (status, json) = get_json(app, &uri).await;

    assert_eq!(status, StatusCode::OK);
    // Rows 0 and 1 are at most a day old.
    assert_eq!(result_ids(&json).len(), 10);
}

#[tokio::test]
async fn invalid_latitude_is_a_validation_error() {
    let (app, _) = memory_app();
    let (status, json) = get_json(app, "/api/v1/query?latitude=91&longitude=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn missing_longitude_is_a_validation_error() {
    let (app, _) = memory_app();
    let (status, json) = get_json(app, "/api/v1/query?latitude=10").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn negative_distance_is_a_validation_error() {
    let (app, _) = memory_app();
    let (status, _) = get_json(app, "/api/v1/query?latitude=0&longitude=0&distance=-5").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn query_timeout_maps_to_gateway_timeout() {
    let (status, json) = get_json(failing_app(true), "/api/v1/query?latitude=0&longitude=0").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"]["code"], "timeout");
}

#[tokio::test]
async fn backend_failure_maps_to_bad_gateway() {
    let (status, json) = get_json(
        failing_app(false),
        "/api/v1/query?latitude=0&longitude=0&distance=100",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "dependency_error");
}

#[tokio::test]
async fn area_query_returns_messages_inside_polygon() {
    let (app, _) = memory_app();
    let body = serde_json::json!({
        "vertices": [
            {"latitude": -0.05, "longitude": -0.05},
            {"latitude": -0.05, "longitude": 0.15},
            {"latitude": 0.05, "longitude": 0.15},
            {"latitude": 0.05, "longitude": -0.05}
        ]
    });
    let (status, json) = post_json(app, "/api/v1/query/area", &body).await;

    assert_eq!(status, StatusCode::OK);
    let mut ids = result_ids(&json);
    ids.sort_unstable();
    assert_eq!(ids, vec![12, 13]);
}

#[tokio::test]
async fn area_query_without_vertices_is_rejected() {
    let (app, _) = memory_app();
    let body = serde_json::json!({ "vertices": [] });
    let (status, json) = post_json(app, "/api/v1/query/area", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn area_query_with_bad_vertex_is_rejected() {
    let (app, _) = memory_app();
    let body = serde_json::json!({ "vertices": [{"latitude": 100.0, "longitude": 0.0}] });
    let (status, _) = post_json(app, "/api/v1/query/area", &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn response_meta_carries_request_id() {
    let (app, _) = memory_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header(REQUEST_ID_HEADER, "trace-me")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "trace-me");
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
    assert_eq!(json["meta"]["request_id"], "trace-me");
}
