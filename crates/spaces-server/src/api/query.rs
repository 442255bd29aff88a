use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spaces_core::{
    Distance, GeoPoint, GeoPolygon, Message, ProximityQuery, ResultOrder, SpatialQueryEngine,
};

use crate::middleware::RequestId;

use super::{map_search_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct QueryParams {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres; absent or `0` asks the server to choose.
    pub distance: Option<f64>,
    pub limit: Option<i64>,
    pub order: Option<ResultOrder>,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct QueryData {
    pub results: Vec<Message>,
    pub distance: Distance,
}

#[derive(Debug, Deserialize)]
pub(super) struct AreaRequest {
    pub vertices: Vec<GeoPoint>,
    pub limit: Option<i64>,
    pub order: Option<ResultOrder>,
}

#[derive(Debug, Serialize)]
pub(super) struct AreaData {
    pub results: Vec<Message>,
}

impl QueryParams {
    fn to_query(&self, default_limit: u32) -> Result<ProximityQuery, String> {
        let point = GeoPoint::new(self.latitude, self.longitude).map_err(|e| e.to_string())?;
        let mut query = ProximityQuery::new(point)
            .with_limit(normalize_limit(self.limit, default_limit))
            .with_order(self.order.unwrap_or_default());

        match self.distance {
            None => {}
            Some(d) if d.abs() <= f64::EPSILON => {}
            Some(d) => {
                let distance = Distance::from_metres(d).map_err(|e| e.to_string())?;
                query = query.with_distance(distance);
            }
        }
        if let Some(since) = self.since {
            query = query.with_since(since);
        }
        Ok(query)
    }
}

pub(super) async fn query_messages<E>(
    State(state): State<AppState<E>>,
    Extension(req_id): Extension<RequestId>,
    params: Result<Query<QueryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<QueryData>>, ApiError>
where
    E: SpatialQueryEngine<Record = Message> + 'static,
{
    let Query(params) =
        params.map_err(|e| ApiError::validation(req_id.0.clone(), e.body_text()))?;
    let query = params
        .to_query(state.result_limit)
        .map_err(|message| ApiError::validation(req_id.0.clone(), message))?;

    let result = state
        .service
        .query(&query)
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: QueryData {
            results: result.records,
            distance: result.distance,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn query_area<E>(
    State(state): State<AppState<E>>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<AreaRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AreaData>>, ApiError>
where
    E: SpatialQueryEngine<Record = Message> + 'static,
{
    let Json(body) = body.map_err(|e| ApiError::validation(req_id.0.clone(), e.body_text()))?;
    let area = GeoPolygon::new(body.vertices)
        .map_err(|e| ApiError::validation(req_id.0.clone(), e.to_string()))?;
    let limit = normalize_limit(body.limit, state.result_limit);

    let results = state
        .service
        .query_area(&area, limit, body.order.unwrap_or_default())
        .await
        .map_err(|e| map_search_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: AreaData { results },
        meta: ResponseMeta::new(req_id.0),
    }))
}
