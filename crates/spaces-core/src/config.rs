use std::env::VarError;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::search::SearchParameters;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from the variables already in the process.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parsing and validation, decoupled from the process environment so tests can
/// pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SPACES_ENV", "development"))?;
    let bind_addr: SocketAddr = parse_var(
        "SPACES_BIND_ADDR",
        &or_default("SPACES_BIND_ADDR", "0.0.0.0:8080"),
    )?;
    let log_level = or_default("SPACES_LOG_LEVEL", "info");

    let db_max_connections: u32 = parse_var(
        "SPACES_DB_MAX_CONNECTIONS",
        &or_default("SPACES_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_var(
        "SPACES_DB_MIN_CONNECTIONS",
        &or_default("SPACES_DB_MIN_CONNECTIONS", "1"),
    )?;
    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "SPACES_DB_MIN_CONNECTIONS".to_string(),
            reason: format!("must not exceed SPACES_DB_MAX_CONNECTIONS ({db_max_connections})"),
        });
    }
    let db_acquire_timeout_secs: u64 = parse_var(
        "SPACES_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("SPACES_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let query_timeout_ms: u64 = parse_var(
        "SPACES_QUERY_TIMEOUT_MS",
        &or_default("SPACES_QUERY_TIMEOUT_MS", "5000"),
    )?;
    let max_concurrent_requests: usize = parse_var(
        "SPACES_MAX_CONCURRENT_REQUESTS",
        &or_default("SPACES_MAX_CONCURRENT_REQUESTS", "64"),
    )?;
    if max_concurrent_requests == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SPACES_MAX_CONCURRENT_REQUESTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let search = SearchParameters {
        too_few: parse_var(
            "SPACES_SEARCH_TOO_FEW",
            &or_default("SPACES_SEARCH_TOO_FEW", "45"),
        )?,
        too_many: parse_var(
            "SPACES_SEARCH_TOO_MANY",
            &or_default("SPACES_SEARCH_TOO_MANY", "75"),
        )?,
        absolute_width: parse_var(
            "SPACES_SEARCH_ABSOLUTE_WIDTH",
            &or_default("SPACES_SEARCH_ABSOLUTE_WIDTH", "6.0"),
        )?,
        relative_width_percent: parse_var(
            "SPACES_SEARCH_RELATIVE_WIDTH_PERCENT",
            &or_default("SPACES_SEARCH_RELATIVE_WIDTH_PERCENT", "6.0"),
        )?,
        initial_interval: None,
    };
    search.validate().map_err(|e| ConfigError::InvalidEnvVar {
        var: "SPACES_SEARCH_*".to_string(),
        reason: e.to_string(),
    })?;

    let result_limit: u32 = parse_var(
        "SPACES_RESULT_LIMIT",
        &or_default("SPACES_RESULT_LIMIT", "50"),
    )?;
    if result_limit == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SPACES_RESULT_LIMIT".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        query_timeout_ms,
        max_concurrent_requests,
        search,
        result_limit,
    })
}

fn parse_var<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SPACES_ENV".to_string(),
            reason: format!("unknown environment `{other}`"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
