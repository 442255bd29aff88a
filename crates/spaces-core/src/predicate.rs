//! Spatial filter and ordering primitives.
//!
//! The builders are pure: they only describe what an engine should evaluate.
//! A PostGIS engine renders [`FilterExpression::WithinDistance`] as
//! `ST_DWithin(location, ST_GeographyFromText(..), metres)`, which lets the
//! planner use the GiST index for a bounding-box pass before the exact
//! geodetic check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::distance::Distance;
use crate::point::{GeoPoint, GeoPolygon};

/// Buffer applied by [`within_area`]; effectively "intersects".
pub const AREA_BUFFER: Distance = Distance(1.0);

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Point(GeoPoint),
    Area(GeoPolygon),
}

/// A single predicate over locatable records.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
    /// Geodetic distance from the record to `target` is at most `distance`.
    WithinDistance { target: Target, distance: Distance },
    /// Record was created at or after the instant.
    CreatedSince(DateTime<Utc>),
}

/// Result ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderExpression {
    /// Ascending geodetic distance from the point. Ties have no defined order.
    DistanceFrom(GeoPoint),
    /// Newest first.
    MostRecent,
}

/// Ordering requested by callers that do not build expressions themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultOrder {
    #[default]
    Nearest,
    Recent,
}

impl ResultOrder {
    #[must_use]
    pub fn to_expression(self, origin: GeoPoint) -> OrderExpression {
        match self {
            Self::Nearest => order_by_distance(origin),
            Self::Recent => order_by_recent(),
        }
    }
}

/// Records within `distance` metres of `point`.
#[must_use]
pub fn within_distance(point: GeoPoint, distance: Distance) -> FilterExpression {
    FilterExpression::WithinDistance {
        target: Target::Point(point),
        distance,
    }
}

/// Records within [`AREA_BUFFER`] of `area`.
#[must_use]
pub fn within_area(area: GeoPolygon) -> FilterExpression {
    FilterExpression::WithinDistance {
        target: Target::Area(area),
        distance: AREA_BUFFER,
    }
}

#[must_use]
pub fn created_since(instant: DateTime<Utc>) -> FilterExpression {
    FilterExpression::CreatedSince(instant)
}

/// Nearest first.
#[must_use]
pub fn order_by_distance(point: GeoPoint) -> OrderExpression {
    OrderExpression::DistanceFrom(point)
}

#[must_use]
pub fn order_by_recent() -> OrderExpression {
    OrderExpression::MostRecent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> GeoPoint {
        GeoPoint::new(51.51333, -0.0889).unwrap()
    }

    #[test]
    fn within_distance_is_idempotent() {
        let d = Distance::from_metres(10_000.0).unwrap();
        assert_eq!(within_distance(london(), d), within_distance(london(), d));
    }

    #[test]
    fn within_area_uses_one_metre_buffer() {
        let polygon = GeoPolygon::new(vec![london()]).unwrap();
        match within_area(polygon.clone()) {
            FilterExpression::WithinDistance { target, distance } => {
                assert_eq!(target, Target::Area(polygon));
                assert!((distance.metres() - 1.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected expression: {other:?}"),
        }
    }

    #[test]
    fn result_order_maps_to_expressions() {
        assert_eq!(
            ResultOrder::Nearest.to_expression(london()),
            OrderExpression::DistanceFrom(london())
        );
        assert_eq!(
            ResultOrder::Recent.to_expression(london()),
            OrderExpression::MostRecent
        );
    }

    #[test]
    fn result_order_deserializes_lowercase() {
        let order: ResultOrder = serde_json::from_str("\"recent\"").unwrap();
        assert_eq!(order, ResultOrder::Recent);
        assert_eq!(ResultOrder::default(), ResultOrder::Nearest);
    }
}
