use chrono::{DateTime, Utc};
use spaces_core::{GeoError, GeoPoint, Message};

/// Input record for inserting a message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub content: String,
    pub location: GeoPoint,
    /// Defaults to `NOW()` when `None`.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewMessage {
    #[must_use]
    pub fn new(content: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            content: content.into(),
            location,
            created_at: None,
        }
    }
}

/// A row from the `messages` table. The derived `location` column is not read
/// back; latitude and longitude carry the same point.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub version: i32,
    pub content: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = GeoError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            id: row.id,
            version: row.version,
            content: row.content,
            location: GeoPoint::new(row.latitude, row.longitude)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
