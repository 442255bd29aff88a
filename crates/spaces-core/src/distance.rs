//! Linear and square-root distances.
//!
//! Result density around a point grows with the area of a disc, which is
//! proportional to the linear distance `d` used by the store, so the radius
//! search bisects over `√d`. The two scales are kept apart as [`Distance`]
//! and [`SqrtDistance`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outer reference distance in metres, standing in for "anywhere on the sphere".
pub const REFERENCE_RADIUS_METRES: f64 = 6_500_000.0;

/// Fraction of [`REFERENCE_RADIUS_METRES`] the search may reach.
pub const REFERENCE_RADIUS_FRACTION: f64 = 0.95;

/// Smallest radius the search will narrow to: `√100`, i.e. a 100 m distance.
pub const MIN_SQRT_DISTANCE: SqrtDistance = SqrtDistance(10.0);

/// Largest radius the search will widen to: `√(0.95 × R)`.
#[must_use]
pub fn max_sqrt_distance() -> SqrtDistance {
    SqrtDistance((REFERENCE_RADIUS_METRES * REFERENCE_RADIUS_FRACTION).sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("distance must be a finite, non-negative number of metres, got {0}")]
pub struct InvalidDistance(pub f64);

/// A non-negative distance in metres.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Distance(pub(crate) f64);

impl Distance {
    pub const ZERO: Self = Self(0.0);

    /// # Errors
    ///
    /// Returns [`InvalidDistance`] for negative, NaN or infinite input.
    pub fn from_metres(metres: f64) -> Result<Self, InvalidDistance> {
        if metres.is_finite() && metres >= 0.0 {
            Ok(Self(metres))
        } else {
            Err(InvalidDistance(metres))
        }
    }

    #[must_use]
    pub fn metres(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn sqrt(self) -> SqrtDistance {
        SqrtDistance(self.0.sqrt())
    }
}

impl TryFrom<f64> for Distance {
    type Error = InvalidDistance;

    fn try_from(metres: f64) -> Result<Self, Self::Error> {
        Self::from_metres(metres)
    }
}

impl From<Distance> for f64 {
    fn from(distance: Distance) -> Self {
        distance.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} m", self.0)
    }
}

/// `√metres`; the coordinate the radius search bisects over.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SqrtDistance(f64);

impl SqrtDistance {
    /// # Errors
    ///
    /// Returns [`InvalidDistance`] for negative, NaN or infinite input.
    pub fn new(value: f64) -> Result<Self, InvalidDistance> {
        if value.is_finite() && value >= 0.0 {
            Ok(Self(value))
        } else {
            Err(InvalidDistance(value))
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn squared(self) -> Distance {
        Distance(self.0 * self.0)
    }

    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self((self.0 + other.0) / 2.0)
    }
}
