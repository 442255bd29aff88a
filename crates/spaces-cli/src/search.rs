//! `radius` and `query` commands against the Postgres engine.

use std::time::Duration;

use spaces_core::{
    AppConfig, Distance, FilterContext, GeoPoint, ProximityQuery, ProximityQueryService,
    RadiusSearch, ResultOrder, SearchParameters,
};
use spaces_db::PgSpatialEngine;

use crate::BandArgs;

#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryOptions {
    pub distance: Option<f64>,
    pub limit: Option<u32>,
    pub order: ResultOrder,
}

/// Configured search parameters with any command-line overrides applied.
pub(crate) fn apply_band(mut params: SearchParameters, band: &BandArgs) -> SearchParameters {
    if let Some(too_few) = band.too_few {
        params.too_few = too_few;
    }
    if let Some(too_many) = band.too_many {
        params.too_many = too_many;
    }
    if let Some(width) = band.absolute_width {
        params.absolute_width = width;
    }
    if let Some(percent) = band.relative_width_percent {
        params.relative_width_percent = percent;
    }
    params
}

fn engine(pool: sqlx::PgPool, config: &AppConfig) -> PgSpatialEngine {
    PgSpatialEngine::new(pool).with_query_timeout(Duration::from_millis(config.query_timeout_ms))
}

/// # Errors
///
/// Returns an error for invalid coordinates or band, or when a count query fails.
pub(crate) async fn run_radius(
    pool: sqlx::PgPool,
    config: &AppConfig,
    latitude: f64,
    longitude: f64,
    band: &BandArgs,
) -> anyhow::Result<()> {
    let point = GeoPoint::new(latitude, longitude)?;
    let params = apply_band(config.search_parameters(), band);
    let search = RadiusSearch::new(engine(pool, config));

    let outcome = search
        .find_radius_detailed(point, &FilterContext::all(), &params)
        .await?;

    let report = serde_json::json!({
        "distance_m": outcome.distance.metres(),
        "count": outcome.count,
        "count_queries": outcome.count_queries,
        "termination": format!("{:?}", outcome.termination),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// # Errors
///
/// Returns an error for invalid input or when any query fails.
pub(crate) async fn run_query(
    pool: sqlx::PgPool,
    config: &AppConfig,
    latitude: f64,
    longitude: f64,
    options: QueryOptions,
) -> anyhow::Result<()> {
    let point = GeoPoint::new(latitude, longitude)?;
    let mut query = ProximityQuery::new(point)
        .with_limit(options.limit.unwrap_or(config.result_limit))
        .with_order(options.order);
    if let Some(d) = options.distance.filter(|d| d.abs() > f64::EPSILON) {
        query = query.with_distance(Distance::from_metres(d)?);
    }

    let service = ProximityQueryService::new(engine(pool, config), config.search_parameters());
    let result = service.query(&query).await?;

    println!(
        "{} message(s) within {}",
        result.records.len(),
        result.distance
    );
    for message in &result.records {
        println!("  {message}");
    }
    Ok(())
}
