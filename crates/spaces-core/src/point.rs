//! Geographic value types.
//!
//! Inputs arrive as (latitude, longitude); everything handed to the geometry
//! layer or rendered as WKT is ordered (longitude, latitude).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spatial reference of every geography value the crate produces (WGS 84).
pub const SRID: u32 = 4326;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("polygon needs at least one vertex")]
    EmptyPolygon,
}

/// An immutable WGS 84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Build a point from latitude and longitude in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] when either coordinate is non-finite or out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Planar `geo` point with `x = longitude`, `y = latitude`.
    #[must_use]
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }

    /// `POINT(lng lat)` with eight decimal places.
    #[must_use]
    pub fn to_wkt(&self) -> String {
        format!("POINT({})", self.wkt_coord())
    }

    /// `SRID=4326;POINT(lng lat)`, the form accepted by `ST_GeographyFromText`.
    #[must_use]
    pub fn to_ewkt(&self) -> String {
        format!("SRID={SRID};{}", self.to_wkt())
    }

    fn wkt_coord(&self) -> String {
        format!("{:.8} {:.8}", self.longitude, self.latitude)
    }
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl From<GeoPoint> for RawPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
        }
    }
}

/// A closed ring of points. Zero-area rings (every vertex equal) are legal and
/// act as a point check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolygon")]
pub struct GeoPolygon {
    vertices: Vec<GeoPoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPolygon {
    vertices: Vec<GeoPoint>,
}

impl TryFrom<RawPolygon> for GeoPolygon {
    type Error = GeoError;

    fn try_from(raw: RawPolygon) -> Result<Self, Self::Error> {
        Self::new(raw.vertices)
    }
}

impl GeoPolygon {
    /// Build a polygon from its vertices. The ring is closed automatically.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::EmptyPolygon`] when `vertices` is empty.
    pub fn new(mut vertices: Vec<GeoPoint>) -> Result<Self, GeoError> {
        let Some(&first) = vertices.first() else {
            return Err(GeoError::EmptyPolygon);
        };
        if vertices.last() != Some(&first) || vertices.len() == 1 {
            vertices.push(first);
        }
        // WKT rings need four positions; pad degenerate rings with the first vertex.
        while vertices.len() < 4 {
            vertices.insert(0, first);
        }
        Ok(Self { vertices })
    }

    /// The closed ring, first vertex repeated at the end.
    #[must_use]
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    #[must_use]
    pub fn to_geo(&self) -> geo::Polygon<f64> {
        let ring: Vec<geo::Coord<f64>> = self
            .vertices
            .iter()
            .map(|p| geo::coord! { x: p.longitude, y: p.latitude })
            .collect();
        geo::Polygon::new(geo::LineString::new(ring), vec![])
    }

    #[must_use]
    pub fn to_ewkt(&self) -> String {
        let ring = self
            .vertices
            .iter()
            .map(GeoPoint::wkt_coord)
            .collect::<Vec<_>>()
            .join(", ");
        format!("SRID={SRID};POLYGON(({ring}))")
    }
}
