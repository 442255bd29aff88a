//! Domain types and the adaptive-radius search for `spaces`.

pub mod app_config;
pub mod config;
pub mod distance;
pub mod engine;
pub mod memory;
pub mod message;
pub mod point;
pub mod predicate;
pub mod proximity;
pub mod search;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use distance::{
    max_sqrt_distance, Distance, InvalidDistance, SqrtDistance, MIN_SQRT_DISTANCE,
};
pub use engine::{FilterContext, LocatableRecord, QueryFailure, SpatialQueryEngine};
pub use memory::InMemoryEngine;
pub use message::Message;
pub use point::{GeoError, GeoPoint, GeoPolygon, SRID};
pub use predicate::{FilterExpression, OrderExpression, ResultOrder, Target};
pub use proximity::{
    ProximityQuery, ProximityQueryService, ProximityResult, DEFAULT_RESULT_LIMIT,
};
pub use search::{
    ConfigurationError, RadiusOutcome, RadiusSearch, SearchError, SearchInterval,
    SearchParameters, Termination,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
