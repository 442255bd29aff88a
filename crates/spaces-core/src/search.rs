//! Adaptive-radius search.
//!
//! Finds a distance around a point whose result count falls inside a target
//! band by bisecting an interval of square-root distances. Every iteration
//! either stops or halves the interval, so the number of count queries is
//! bounded by `log2((max - min) / width)` regardless of how many records the
//! engine holds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::distance::{max_sqrt_distance, Distance, SqrtDistance, MIN_SQRT_DISTANCE};
use crate::engine::{FilterContext, QueryFailure, SpatialQueryEngine};
use crate::point::{GeoError, GeoPoint};
use crate::predicate::within_distance;

pub const DEFAULT_TOO_FEW: u64 = 45;
pub const DEFAULT_TOO_MANY: u64 = 75;
pub const DEFAULT_CLOSENESS: f64 = 6.0;

/// Invalid search parameters. Raised before any query is issued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("too_few ({too_few}) must be less than too_many ({too_many})")]
    InvertedBand { too_few: u64, too_many: u64 },

    #[error("{name} must be a finite, non-negative number, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("absolute_width and relative_width_percent cannot both be zero")]
    NoStoppingThreshold,

    #[error("search interval [{lo}, {hi}] must be ordered and within [{min}, {max}]")]
    InvalidInterval { lo: f64, hi: f64, min: f64, max: f64 },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Query(#[from] QueryFailure),

    #[error(transparent)]
    Geometry(#[from] GeoError),
}

/// The current uncertainty band for the target radius, in `√metres`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchInterval {
    lo: SqrtDistance,
    hi: SqrtDistance,
}

impl SearchInterval {
    /// `[MIN_SQRT_DISTANCE, max_sqrt_distance()]`.
    #[must_use]
    pub fn full() -> Self {
        Self {
            lo: MIN_SQRT_DISTANCE,
            hi: max_sqrt_distance(),
        }
    }

    /// A caller-supplied starting interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidInterval`] unless
    /// `MIN_SQRT_DISTANCE <= lo <= hi <= max_sqrt_distance()`.
    pub fn new(lo: SqrtDistance, hi: SqrtDistance) -> Result<Self, ConfigurationError> {
        let (min, max) = (MIN_SQRT_DISTANCE, max_sqrt_distance());
        if lo < min || hi > max || lo > hi {
            return Err(ConfigurationError::InvalidInterval {
                lo: lo.value(),
                hi: hi.value(),
                min: min.value(),
                max: max.value(),
            });
        }
        Ok(Self { lo, hi })
    }

    /// Interval covering the square roots of two linear distances.
    ///
    /// # Errors
    ///
    /// Same as [`SearchInterval::new`].
    pub fn from_distances(lo: Distance, hi: Distance) -> Result<Self, ConfigurationError> {
        Self::new(lo.sqrt(), hi.sqrt())
    }

    #[must_use]
    pub fn lo(&self) -> SqrtDistance {
        self.lo
    }

    #[must_use]
    pub fn hi(&self) -> SqrtDistance {
        self.hi
    }

    #[must_use]
    pub fn midpoint(&self) -> SqrtDistance {
        self.lo.midpoint(self.hi)
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        (self.hi.value() - self.lo.value()).abs()
    }

    fn lower_half(self) -> Self {
        Self {
            lo: self.lo,
            hi: self.midpoint(),
        }
    }

    fn upper_half(self) -> Self {
        Self {
            lo: self.midpoint(),
            hi: self.hi,
        }
    }
}

impl Default for SearchInterval {
    fn default() -> Self {
        Self::full()
    }
}

/// Target band and stopping thresholds.
///
/// `absolute_width` is measured in `√metres`; `relative_width_percent` is the
/// interval width as a percentage of its midpoint. Both default to `6.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParameters {
    pub too_few: u64,
    pub too_many: u64,
    pub absolute_width: f64,
    pub relative_width_percent: f64,
    #[serde(skip)]
    pub initial_interval: Option<SearchInterval>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            too_few: DEFAULT_TOO_FEW,
            too_many: DEFAULT_TOO_MANY,
            absolute_width: DEFAULT_CLOSENESS,
            relative_width_percent: DEFAULT_CLOSENESS,
            initial_interval: None,
        }
    }
}

impl SearchParameters {
    #[must_use]
    pub fn with_band(mut self, too_few: u64, too_many: u64) -> Self {
        self.too_few = too_few;
        self.too_many = too_many;
        self
    }

    /// Sets both stopping thresholds to the same number.
    #[must_use]
    pub fn with_closeness(mut self, closeness: f64) -> Self {
        self.absolute_width = closeness;
        self.relative_width_percent = closeness;
        self
    }

    #[must_use]
    pub fn with_interval(mut self, interval: SearchInterval) -> Self {
        self.initial_interval = Some(interval);
        self
    }

    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.too_few >= self.too_many {
            return Err(ConfigurationError::InvertedBand {
                too_few: self.too_few,
                too_many: self.too_many,
            });
        }
        for (name, value) in [
            ("absolute_width", self.absolute_width),
            ("relative_width_percent", self.relative_width_percent),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidThreshold { name, value });
            }
        }
        if self.absolute_width <= 0.0 && self.relative_width_percent <= 0.0 {
            return Err(ConfigurationError::NoStoppingThreshold);
        }
        if let Some(interval) = self.initial_interval {
            SearchInterval::new(interval.lo, interval.hi)?;
        }
        Ok(())
    }

    fn in_band(&self, count: u64) -> bool {
        (self.too_few..=self.too_many).contains(&count)
    }

    fn is_narrow_enough(&self, interval: &SearchInterval) -> bool {
        let width = interval.width();
        let mid = interval.midpoint().value();
        width < self.absolute_width
            || (mid > 0.0 && width / mid * 100.0 < self.relative_width_percent)
    }
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The last count fell inside the band.
    Accepted,
    /// The interval became narrower than the stopping thresholds.
    WidthExhausted,
    /// Still too many results at the smallest allowed radius.
    LowerBound,
    /// Still too few results at the largest allowed radius.
    UpperBound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusOutcome {
    pub distance: Distance,
    pub count_queries: usize,
    pub termination: Termination,
    /// Count observed at `distance`, when one was taken there.
    pub count: Option<u64>,
}

/// Runs the bisection against an injected engine.
#[derive(Debug, Clone)]
pub struct RadiusSearch<E> {
    engine: E,
}

impl<E: SpatialQueryEngine> RadiusSearch<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Distance around `point` yielding roughly `too_few..=too_many` records of `base`.
    ///
    /// # Errors
    ///
    /// [`SearchError::Configuration`] for invalid parameters (no query is
    /// issued); [`SearchError::Query`] when any count fails.
    pub async fn find_radius(
        &self,
        point: GeoPoint,
        base: &FilterContext,
        params: &SearchParameters,
    ) -> Result<Distance, SearchError> {
        self.find_radius_detailed(point, base, params)
            .await
            .map(|outcome| outcome.distance)
    }

    /// Like [`RadiusSearch::find_radius`], also reporting how the search ended.
    ///
    /// # Errors
    ///
    /// Same as [`RadiusSearch::find_radius`].
    pub async fn find_radius_detailed(
        &self,
        point: GeoPoint,
        base: &FilterContext,
        params: &SearchParameters,
    ) -> Result<RadiusOutcome, SearchError> {
        params.validate()?;

        let (min, max) = (MIN_SQRT_DISTANCE, max_sqrt_distance());
        let mut interval = params.initial_interval.unwrap_or_default();
        let mut count_queries = 0_usize;
        let mut last_count: Option<u64> = None;

        loop {
            let mid = interval.midpoint();
            let distance = mid.squared();

            if params.is_narrow_enough(&interval) {
                // The band was never reached and the interval still touches a
                // global bound: count there before reporting it as the answer.
                let bound = match last_count {
                    Some(c) if c < params.too_few && interval.hi() >= max => {
                        Some((max, Termination::UpperBound))
                    }
                    Some(c) if c > params.too_many && interval.lo() <= min => {
                        Some((min, Termination::LowerBound))
                    }
                    _ => None,
                };
                let mut outcome = RadiusOutcome {
                    distance,
                    count_queries,
                    termination: Termination::WidthExhausted,
                    count: None,
                };
                if let Some((bound, termination)) = bound {
                    let at_bound = bound.squared();
                    let filter = base.filter(within_distance(point, at_bound));
                    let count = self.engine.count(&filter).await?;
                    outcome.count_queries += 1;
                    let confirmed = match termination {
                        Termination::UpperBound => count < params.too_few,
                        _ => count > params.too_many,
                    };
                    if confirmed || params.in_band(count) {
                        outcome.distance = at_bound;
                        outcome.count = Some(count);
                        outcome.termination = if confirmed {
                            termination
                        } else {
                            Termination::Accepted
                        };
                    }
                }
                tracing::debug!(
                    distance = %outcome.distance,
                    count_queries = outcome.count_queries,
                    termination = ?outcome.termination,
                    "radius search stopped"
                );
                return Ok(outcome);
            }

            let filter = base.filter(within_distance(point, distance));
            let count = self.engine.count(&filter).await?;
            count_queries += 1;
            last_count = Some(count);

            tracing::debug!(
                lo = interval.lo().value(),
                hi = interval.hi().value(),
                %distance,
                count,
                "radius search iteration"
            );

            if count > params.too_many && mid > min {
                interval = interval.lower_half();
            } else if count < params.too_few && mid < max {
                interval = interval.upper_half();
            } else {
                let termination = if count > params.too_many {
                    Termination::LowerBound
                } else if count < params.too_few {
                    Termination::UpperBound
                } else {
                    Termination::Accepted
                };
                tracing::info!(%distance, count, count_queries, "radius search settled");
                return Ok(RadiusOutcome {
                    distance,
                    count_queries,
                    termination,
                    count: Some(count),
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
