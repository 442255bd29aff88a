//! Read operations for the `messages` table.

use spaces_core::Message;
use sqlx::PgPool;

use super::types::MessageRow;
use super::MESSAGE_COLUMNS;
use crate::DbError;

/// # Errors
///
/// Returns [`DbError::NotFound`] when no message has `id`, [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_message(pool: &PgPool, id: i64) -> Result<Message, DbError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(Message::try_from(row)?)
}

/// Total number of stored messages.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn count_messages(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
        .fetch_one(pool)
        .await
}
