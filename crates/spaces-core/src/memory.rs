//! A [`SpatialQueryEngine`] over an in-memory slice of records.
//!
//! Distances are great-circle (haversine) metres, so results agree with a
//! geography-typed store to within the spherical approximation. Used by the
//! test suites and for running the service without a database.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use geo::algorithm::{ClosestPoint, Contains, Distance, Haversine};
use geo::Closest;

use crate::engine::{FilterContext, LocatableRecord, QueryFailure, SpatialQueryEngine};
use crate::point::{GeoPoint, GeoPolygon};
use crate::predicate::{FilterExpression, OrderExpression, Target};

/// Great-circle distance between two points in metres.
#[must_use]
pub fn geodetic_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    Haversine.distance(a.to_geo(), b.to_geo())
}

/// Distance from `point` to the nearest part of `area`; zero inside it.
#[must_use]
pub fn distance_to_area(point: GeoPoint, area: &GeoPolygon) -> f64 {
    let p = point.to_geo();
    let polygon = area.to_geo();
    if polygon.contains(&p) {
        return 0.0;
    }
    match polygon.exterior().closest_point(&p) {
        Closest::Intersection(c) | Closest::SinglePoint(c) => Haversine.distance(p, c),
        // Degenerate ring: fall back to the nearest vertex.
        Closest::Indeterminate => area
            .vertices()
            .iter()
            .map(|v| geodetic_distance(point, *v))
            .fold(f64::INFINITY, f64::min),
    }
}

#[derive(Debug)]
pub struct InMemoryEngine<R> {
    records: Arc<Vec<R>>,
    count_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl<R> Clone for InMemoryEngine<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            count_calls: Arc::clone(&self.count_calls),
            fetch_calls: Arc::clone(&self.fetch_calls),
        }
    }
}

impl<R> InMemoryEngine<R>
where
    R: LocatableRecord + Clone + Send + Sync,
{
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records: Arc::new(records),
            count_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Count queries served so far, across clones.
    #[must_use]
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn matching<'a>(&'a self, filter: &'a FilterContext) -> impl Iterator<Item = &'a R> + 'a {
        self.records
            .iter()
            .filter(move |record| filter.predicates().iter().all(|p| satisfies(*record, p)))
    }
}

fn satisfies<R: LocatableRecord>(record: &R, predicate: &FilterExpression) -> bool {
    match predicate {
        FilterExpression::WithinDistance { target, distance } => {
            let metres = match target {
                Target::Point(point) => geodetic_distance(record.point(), *point),
                Target::Area(area) => distance_to_area(record.point(), area),
            };
            metres <= distance.metres()
        }
        FilterExpression::CreatedSince(instant) => record.created_at() >= *instant,
    }
}

impl<R> SpatialQueryEngine for InMemoryEngine<R>
where
    R: LocatableRecord + Clone + Send + Sync,
{
    type Record = R;

    async fn count(&self, filter: &FilterContext) -> Result<u64, QueryFailure> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matching(filter).count() as u64)
    }

    async fn fetch(
        &self,
        filter: &FilterContext,
        order: &OrderExpression,
        limit: u32,
    ) -> Result<Vec<R>, QueryFailure> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut hits: Vec<&R> = self.matching(filter).collect();
        match order {
            OrderExpression::DistanceFrom(origin) => hits.sort_by(|a, b| {
                geodetic_distance(a.point(), *origin)
                    .partial_cmp(&geodetic_distance(b.point(), *origin))
                    .unwrap_or(CmpOrdering::Equal)
            }),
            OrderExpression::MostRecent => hits.sort_by_key(|r| std::cmp::Reverse(r.created_at())),
        }
        Ok(hits
            .into_iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
