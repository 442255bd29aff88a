use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::LocatableRecord;
use crate::point::GeoPoint;

/// A short piece of text pinned to a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub version: i32,
    pub content: String,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// First `max_chars` characters of the content, with `...` when cut.
    #[must_use]
    pub fn snippet(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Message id=\"{}\" content=\"{}\">",
            self.id,
            self.snippet(20)
        )
    }
}

impl LocatableRecord for Message {
    fn point(&self) -> GeoPoint {
        self.location
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
