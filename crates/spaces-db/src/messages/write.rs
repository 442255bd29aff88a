//! Write operations for the `messages` table.

use chrono::{DateTime, Utc};
use spaces_core::{GeoPoint, Message};
use sqlx::PgPool;

use super::types::{MessageRow, NewMessage};
use super::MESSAGE_COLUMNS;
use crate::DbError;

/// Insert a batch of messages in one round-trip and return their ids in input
/// order. The `location` column is filled by the table trigger.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn insert_messages(
    pool: &PgPool,
    messages: &[NewMessage],
) -> Result<Vec<i64>, sqlx::Error> {
    if messages.is_empty() {
        return Ok(Vec::new());
    }

    let mut contents: Vec<String> = Vec::with_capacity(messages.len());
    let mut latitudes: Vec<f64> = Vec::with_capacity(messages.len());
    let mut longitudes: Vec<f64> = Vec::with_capacity(messages.len());
    let mut created: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(messages.len());

    for m in messages {
        contents.push(m.content.clone());
        latitudes.push(m.location.latitude());
        longitudes.push(m.location.longitude());
        created.push(m.created_at);
    }

    let ids = sqlx::query_scalar::<_, i64>(
        "INSERT INTO messages (content, latitude, longitude, created_at, updated_at) \
         SELECT t.content, t.latitude, t.longitude, \
                COALESCE(t.created_at, NOW()), COALESCE(t.created_at, NOW()) \
         FROM UNNEST($1::text[], $2::float8[], $3::float8[], $4::timestamptz[]) \
              WITH ORDINALITY AS t(content, latitude, longitude, created_at, ord) \
         ORDER BY t.ord \
         RETURNING id",
    )
    .bind(&contents)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&created)
    .fetch_all(pool)
    .await?;

    tracing::debug!(inserted = ids.len(), "messages inserted");
    Ok(ids)
}

/// Move a message and bump its version. `updated_at` and the derived
/// geography are refreshed by the table trigger.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] when no message has `id`, [`DbError::Sqlx`]
/// if the query fails.
pub async fn update_message_location(
    pool: &PgPool,
    id: i64,
    location: GeoPoint,
) -> Result<Message, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        "UPDATE messages \
         SET latitude = $2, longitude = $3, version = version + 1 \
         WHERE id = $1 \
         RETURNING {MESSAGE_COLUMNS}"
    ))
    .bind(id)
    .bind(location.latitude())
    .bind(location.longitude())
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(Message::try_from(row)?)
}

/// Remove every message. Returns the number of rows deleted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn delete_all_messages(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM messages").execute(pool).await?;
    Ok(result.rows_affected())
}
