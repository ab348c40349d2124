//! Represents a registered file: the mapping from a shareable token to an
//! externally stored file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// The kind of media the messaging collaborator holds under a file identifier.
///
/// Stored with the record; delivery uses it to pick the send primitive.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FileKind {
    Document,
    Photo,
    Video,
    Audio,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    /// Filename extension used when the sender supplied no name.
    /// Documents always carry their own name, so they have none.
    pub fn default_extension(&self) -> Option<&'static str> {
        match self {
            Self::Document => None,
            Self::Photo => Some("jpg"),
            Self::Video => Some("mp4"),
            Self::Audio => Some("mp3"),
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted file registration.
///
/// The record holds only the opaque handle of the bytes, never the bytes
/// themselves. Apart from deletion, records are never modified after insert.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct FileRecord {
    /// Store-assigned primary key, monotonic across the table's history.
    pub id: i64,

    /// Handle referencing the bytes held by the delivery collaborator.
    pub file_identifier: String,

    /// Shareable token. Unique across all records ever inserted.
    pub unique_token: String,

    /// Media kind, used to pick the delivery primitive.
    pub file_kind: FileKind,

    /// Filename as submitted, if any.
    pub original_filename: Option<String>,

    /// Identity of the admin who registered the file.
    pub uploader_id: i64,

    /// When the record was inserted.
    pub uploaded_at: DateTime<Utc>,
}

/// Field values for a record that has not been inserted yet.
#[derive(Clone, Debug)]
pub struct NewFileRecord {
    pub file_identifier: String,
    pub unique_token: String,
    pub file_kind: FileKind,
    pub original_filename: Option<String>,
    pub uploader_id: i64,
}
