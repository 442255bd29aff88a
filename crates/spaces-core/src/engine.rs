//! The contract between the search core and whatever stores the records.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::point::GeoPoint;
use crate::predicate::{FilterExpression, OrderExpression};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An engine-side failure during a count or fetch.
///
/// Never retried by the core; a resilient engine retries internally.
#[derive(Debug, Error)]
pub enum QueryFailure {
    #[error("query backend failed: {0}")]
    Backend(#[source] BoxError),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

impl QueryFailure {
    pub fn backend(error: impl Into<BoxError>) -> Self {
        Self::Backend(error.into())
    }
}

/// Something the engine can filter by location and age.
pub trait LocatableRecord {
    fn point(&self) -> GeoPoint;
    fn created_at(&self) -> DateTime<Utc>;
}

/// An accumulating, conjunctive query scope.
///
/// [`FilterContext::filter`] returns a new context; the receiver is left as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterContext {
    predicates: Vec<FilterExpression>,
}

impl FilterContext {
    /// Every record.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(&self, expression: FilterExpression) -> Self {
        let mut predicates = self.predicates.clone();
        predicates.push(expression);
        Self { predicates }
    }

    #[must_use]
    pub fn predicates(&self) -> &[FilterExpression] {
        &self.predicates
    }

    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Executes filter contexts against a record store.
///
/// Implementations must serve concurrent read-only calls; the core adds no
/// locking of its own.
pub trait SpatialQueryEngine: Send + Sync {
    type Record: Send;

    /// Number of records matching every predicate in `filter`.
    fn count(
        &self,
        filter: &FilterContext,
    ) -> impl Future<Output = Result<u64, QueryFailure>> + Send;

    /// At most `limit` matching records in `order`.
    fn fetch(
        &self,
        filter: &FilterContext,
        order: &OrderExpression,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Self::Record>, QueryFailure>> + Send;

    /// Liveness probe used by health checks.
    fn ping(&self) -> impl Future<Output = Result<(), QueryFailure>> + Send {
        async { Ok(()) }
    }
}
