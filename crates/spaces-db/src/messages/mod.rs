//! Database operations for the `messages` table.

mod read;
mod types;
mod write;

pub use read::{count_messages, get_message};
pub use types::{MessageRow, NewMessage};
pub use write::{delete_all_messages, insert_messages, update_message_location};

/// Columns selected whenever a full [`MessageRow`] is read back.
pub(crate) const MESSAGE_COLUMNS: &str =
    "id, version, content, latitude, longitude, created_at, updated_at";
