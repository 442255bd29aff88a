//! Offline tests for pool configuration and row conversion.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use chrono::Utc;
use spaces_core::{AppConfig, Environment, GeoPoint, Message, SearchParameters};
use spaces_db::{MessageRow, NewMessage, PoolConfig};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        query_timeout_ms: 5000,
        max_concurrent_requests: 64,
        search: SearchParameters::default(),
        result_limit: 50,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn message_row_converts_to_message() {
    let now = Utc::now();
    let row = MessageRow {
        id: 3,
        version: 2,
        content: "I am message 3".to_string(),
        latitude: 12.5,
        longitude: -45.25,
        created_at: now,
        updated_at: now,
    };

    let message = Message::try_from(row).unwrap();

    assert_eq!(message.id, 3);
    assert_eq!(message.version, 2);
    assert_eq!(message.location, GeoPoint::new(12.5, -45.25).unwrap());
}

#[test]
fn message_row_with_bad_coordinates_is_rejected() {
    let now = Utc::now();
    let row = MessageRow {
        id: 1,
        version: 1,
        content: String::new(),
        latitude: 91.0,
        longitude: 0.0,
        created_at: now,
        updated_at: now,
    };

    assert!(Message::try_from(row).is_err());
}

#[test]
fn new_message_defaults_created_at_to_none() {
    let m = NewMessage::new("hello", GeoPoint::new(0.0, 0.0).unwrap());
    assert!(m.created_at.is_none());
    assert_eq!(m.content, "hello");
}
