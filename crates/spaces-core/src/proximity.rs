//! Nearby-record lookup: pick a radius when the caller gave none, then fetch.

use chrono::{DateTime, Utc};

use crate::distance::Distance;
use crate::engine::{FilterContext, SpatialQueryEngine};
use crate::point::{GeoError, GeoPoint, GeoPolygon};
use crate::predicate::{created_since, within_area, within_distance, ResultOrder};
use crate::search::{RadiusSearch, SearchError, SearchParameters};

pub const DEFAULT_RESULT_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityQuery {
    pub point: GeoPoint,
    /// `None` lets the radius search choose.
    pub distance: Option<Distance>,
    pub limit: u32,
    pub order: ResultOrder,
    /// Only consider records created at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl ProximityQuery {
    #[must_use]
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            distance: None,
            limit: DEFAULT_RESULT_LIMIT,
            order: ResultOrder::Nearest,
            since: None,
        }
    }

    #[must_use]
    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = Some(distance);
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: ResultOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityResult<R> {
    pub records: Vec<R>,
    /// The distance actually used, either given or searched for.
    pub distance: Distance,
}

#[derive(Debug, Clone)]
pub struct ProximityQueryService<E> {
    search: RadiusSearch<E>,
    params: SearchParameters,
}

impl<E: SpatialQueryEngine> ProximityQueryService<E> {
    pub fn new(engine: E, params: SearchParameters) -> Self {
        Self {
            search: RadiusSearch::new(engine),
            params,
        }
    }

    pub fn engine(&self) -> &E {
        self.search.engine()
    }

    pub fn params(&self) -> &SearchParameters {
        &self.params
    }

    /// Records near `query.point`, searching for a radius when none was given.
    ///
    /// # Errors
    ///
    /// [`SearchError::Configuration`] when the service's search parameters are
    /// invalid and a radius had to be searched for; [`SearchError::Query`] when
    /// any engine call fails.
    pub async fn query(
        &self,
        query: &ProximityQuery,
    ) -> Result<ProximityResult<E::Record>, SearchError> {
        let base = match query.since {
            Some(since) => FilterContext::all().filter(created_since(since)),
            None => FilterContext::all(),
        };

        let distance = match query.distance {
            Some(distance) => distance,
            None => {
                self.search
                    .find_radius(query.point, &base, &self.params)
                    .await?
            }
        };

        let filter = base.filter(within_distance(query.point, distance));
        let order = query.order.to_expression(query.point);
        let records = self.engine().fetch(&filter, &order, query.limit).await?;

        tracing::debug!(%distance, returned = records.len(), "proximity query served");
        Ok(ProximityResult { records, distance })
    }

    /// Records inside (or within a metre of) `area`.
    ///
    /// # Errors
    ///
    /// [`SearchError::Geometry`] for a ring without vertices;
    /// [`SearchError::Query`] when the fetch fails.
    pub async fn query_area(
        &self,
        area: &GeoPolygon,
        limit: u32,
        order: ResultOrder,
    ) -> Result<Vec<E::Record>, SearchError> {
        // Nearest-first is measured from the first vertex of the ring.
        let Some(&origin) = area.vertices().first() else {
            return Err(GeoError::EmptyPolygon.into());
        };
        let filter = FilterContext::all().filter(within_area(area.clone()));
        let records = self
            .engine()
            .fetch(&filter, &order.to_expression(origin), limit)
            .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::memory::InMemoryEngine;
    use crate::message::Message;

    fn message(id: i64, latitude: f64, longitude: f64, age_days: i64) -> Message {
        let created = Utc::now() - Duration::days(age_days);
        Message {
            id,
            version: 1,
            content: format!("I am message {id}"),
            location: GeoPoint::new(latitude, longitude).unwrap(),
            created_at: created,
            updated_at: created,
        }
    }

    /// A 0.1° grid of messages around the origin.
    #[allow(clippy::cast_precision_loss)]
    fn grid(side: i64) -> Vec<Message> {
        let mut out = Vec::new();
        for i in 0..side {
            for j in 0..side {
                let lat = (i - side / 2) as f64 * 0.1;
                let lng = (j - side / 2) as f64 * 0.1;
                out.push(message(i * side + j, lat, lng, i));
            }
        }
        out
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(0.0, 0.0).unwrap()
    }

    #[tokio::test]
    async fn explicit_distance_skips_radius_search() {
        let engine = InMemoryEngine::new(grid(11));
        let service = ProximityQueryService::new(engine.clone(), SearchParameters::default());
        let query =
            ProximityQuery::new(origin()).with_distance(Distance::from_metres(12_000.0).unwrap());

        let result = service.query(&query).await.unwrap();

        assert_eq!(engine.count_calls(), 0);
        assert_eq!(engine.fetch_calls(), 1);
        // Origin plus its four 0.1° neighbours (~11.1 km away).
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.records[0].location, origin());
        assert!((result.distance.metres() - 12_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn missing_distance_runs_radius_search() {
        let engine = InMemoryEngine::new(grid(31));
        let params = SearchParameters::default().with_band(20, 40);
        let service = ProximityQueryService::new(engine.clone(), params);

        let result = service.query(&ProximityQuery::new(origin())).await.unwrap();

        assert!(engine.count_calls() > 0);
        let filter = FilterContext::all().filter(within_distance(origin(), result.distance));
        let count = engine.count(&filter).await.unwrap();
        assert!((20..=40).contains(&count), "count at chosen distance: {count}");
        assert_eq!(result.records.len() as u64, count);
    }

    #[tokio::test]
    async fn limit_caps_results() {
        let engine = InMemoryEngine::new(grid(11));
        let service = ProximityQueryService::new(engine, SearchParameters::default());
        let query = ProximityQuery::new(origin())
            .with_distance(Distance::from_metres(1_000_000.0).unwrap())
            .with_limit(3);

        let result = service.query(&query).await.unwrap();

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.records[0].location, origin());
    }

    #[tokio::test]
    async fn recent_order_and_since_filter_apply() {
        let engine = InMemoryEngine::new(grid(11));
        let service = ProximityQueryService::new(engine, SearchParameters::default());
        let query = ProximityQuery::new(origin())
            .with_distance(Distance::from_metres(1_000_000.0).unwrap())
            .with_order(ResultOrder::Recent)
            .with_since(Utc::now() - Duration::days(2) - Duration::hours(1));

        let result = service.query(&query).await.unwrap();

        // Rows 0..=2 of the grid are at most two days old.
        assert_eq!(result.records.len(), 33);
        assert!(result
            .records
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn invalid_parameters_surface_as_configuration_error() {
        let engine = InMemoryEngine::new(grid(3));
        let params = SearchParameters::default().with_band(10, 5);
        let service = ProximityQueryService::new(engine.clone(), params);

        let err = service
            .query(&ProximityQuery::new(origin()))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Configuration(_)));
        assert_eq!(engine.count_calls(), 0);
        assert_eq!(engine.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn area_query_returns_records_inside_polygon() {
        let engine = InMemoryEngine::new(grid(11));
        let service = ProximityQueryService::new(engine, SearchParameters::default());
        let area = GeoPolygon::new(vec![
            GeoPoint::new(-0.05, -0.05).unwrap(),
            GeoPoint::new(-0.05, 0.15).unwrap(),
            GeoPoint::new(0.05, 0.15).unwrap(),
            GeoPoint::new(0.05, -0.05).unwrap(),
        ])
        .unwrap();

        let records = service
            .query_area(&area, 10, ResultOrder::Nearest)
            .await
            .unwrap();

        let mut ids: Vec<i64> = records.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        // (0, 0) and (0, 0.1) in grid coordinates.
        assert_eq!(ids, vec![60, 61]);
    }
}
