//! Messages exchanged with the messaging transport.
//!
//! The transport (polling loop or webhook relay) forwards each relevant update
//! as an [`InboundUpdate`] and performs the returned [`BotAction`]. File bytes
//! never pass through here, only their opaque identifiers.

use super::file_record::FileKind;
use serde::{Deserialize, Serialize};

/// An update relayed by the messaging transport.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundUpdate {
    /// `/start`, optionally carrying a deep-link payload.
    Start {
        chat_id: i64,
        sender_id: i64,
        #[serde(default)]
        payload: Option<String>,
    },

    /// `/help`.
    Help { chat_id: i64 },

    /// A forwarded document, photo, video or audio message.
    File {
        chat_id: i64,
        sender_id: i64,
        file_kind: FileKind,
        file_identifier: String,
        /// Transport-stable id of the bytes, used to name unnamed media.
        #[serde(default)]
        file_unique_id: Option<String>,
        #[serde(default)]
        filename: Option<String>,
    },
}

/// What the transport should do in response to an update.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BotAction {
    /// Send a text message.
    Reply { chat_id: i64, text: String },

    /// Send the stored file identified by `file_identifier`.
    Deliver {
        chat_id: i64,
        file_kind: FileKind,
        file_identifier: String,
        filename: Option<String>,
    },
}

impl BotAction {
    pub fn reply(chat_id: i64, text: impl Into<String>) -> Self {
        Self::Reply {
            chat_id,
            text: text.into(),
        }
    }
}
