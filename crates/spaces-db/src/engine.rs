//! PostGIS-backed [`SpatialQueryEngine`].
//!
//! Filter and order expressions are rendered into SQL with bound parameters;
//! distances use the `geography` type so `ST_DWithin` and `ST_Distance` work
//! in metres on the spheroid.

use std::time::Duration;

use spaces_core::{
    FilterContext, FilterExpression, Message, OrderExpression, QueryFailure, SpatialQueryEngine,
    Target,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::messages::{MessageRow, MESSAGE_COLUMNS};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PgSpatialEngine {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgSpatialEngine {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, QueryFailure>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(QueryFailure::backend(e)),
            Err(_) => Err(QueryFailure::Timeout(self.query_timeout)),
        }
    }
}

fn push_target(builder: &mut QueryBuilder<'_, Postgres>, target: &Target) {
    let ewkt = match target {
        Target::Point(point) => point.to_ewkt(),
        Target::Area(area) => area.to_ewkt(),
    };
    builder.push("ST_GeographyFromText(");
    builder.push_bind(ewkt);
    builder.push(")");
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &FilterContext) {
    for (i, predicate) in filter.predicates().iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match predicate {
            FilterExpression::WithinDistance { target, distance } => {
                builder.push("ST_DWithin(location, ");
                push_target(builder, target);
                builder.push(", ");
                builder.push_bind(distance.metres());
                builder.push(")");
            }
            FilterExpression::CreatedSince(instant) => {
                builder.push("created_at >= ");
                builder.push_bind(*instant);
            }
        }
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, order: &OrderExpression) {
    match order {
        OrderExpression::DistanceFrom(point) => {
            builder.push(" ORDER BY ST_Distance(location, ");
            push_target(builder, &Target::Point(*point));
            builder.push("), id");
        }
        OrderExpression::MostRecent => {
            builder.push(" ORDER BY created_at DESC, id DESC");
        }
    }
}

pub(crate) fn count_query(filter: &FilterContext) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM messages");
    push_filter(&mut builder, filter);
    builder
}

pub(crate) fn fetch_query(
    filter: &FilterContext,
    order: &OrderExpression,
    limit: u32,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {MESSAGE_COLUMNS} FROM messages"));
    push_filter(&mut builder, filter);
    push_order(&mut builder, order);
    builder.push(" LIMIT ");
    builder.push_bind(i64::from(limit));
    builder
}

impl SpatialQueryEngine for PgSpatialEngine {
    type Record = Message;

    async fn count(&self, filter: &FilterContext) -> Result<u64, QueryFailure> {
        let mut builder = count_query(filter);
        let query = builder.build_query_scalar::<i64>();
        let count = self.bounded(query.fetch_one(&self.pool)).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn fetch(
        &self,
        filter: &FilterContext,
        order: &OrderExpression,
        limit: u32,
    ) -> Result<Vec<Message>, QueryFailure> {
        let mut builder = fetch_query(filter, order, limit);
        let query = builder.build_query_as::<MessageRow>();
        let rows = self.bounded(query.fetch_all(&self.pool)).await?;

        rows.into_iter()
            .map(|row| Message::try_from(row).map_err(QueryFailure::backend))
            .collect()
    }

    async fn ping(&self) -> Result<(), QueryFailure> {
        self.bounded(crate::ping(&self.pool)).await
    }
}
