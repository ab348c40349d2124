//! Messaging-side front-end.
//!
//! The bot transport relays updates to `POST /bot/updates` and performs the
//! returned action: admins forward files and get a shareable link back,
//! anyone holding a link sends `/start <token>` and receives the file.

use crate::{
    errors::AppError,
    models::{
        bot::{BotAction, InboundUpdate},
        file_record::FileKind,
    },
    services::registry_service::{RegistryError, RegistryResult, RegistryService, Submission},
    state::AppState,
};
use axum::{Json, extract::State, http::HeaderMap};
use subtle::ConstantTimeEq;
use tracing::{error, info};

/// Header the transport uses to prove it is the configured bot.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

const WELCOME_TEXT: &str =
    "Hi! This bot hands out files shared through links. Send /help to see how it works.";

const HELP_TEXT: &str = "File hosting bot help\n\n\
For admins:\n\
1. Upload files to a private channel.\n\
2. Forward them to this bot in a private chat.\n\
3. The bot replies with a shareable link for each file.\n\n\
For users:\n\
Open a shareable link and the bot sends you the file.\n\n\
Commands:\n\
/start - Welcome message, or retrieve a file when opened through a link.\n\
/help - Shows this help message.";

const INVALID_LINK_TEXT: &str = "Invalid or expired file link.";

/// `POST /bot/updates`
///
/// Store outages surface as 503 so the transport can redeliver the update;
/// every other outcome is an action for the chat.
pub async fn bot_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<InboundUpdate>,
) -> Result<Json<BotAction>, AppError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let presented = headers
            .get(SECRET_TOKEN_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        if !bool::from(presented.ct_eq(expected.as_bytes())) {
            return Err(AppError::unauthorized("invalid bot secret token"));
        }
    }

    let action = handle_update(&state.registry, update).await?;
    Ok(Json(action))
}

/// Turn one update into the action the transport should perform.
///
/// Only `StoreUnavailable` is returned as an error; denials, duplicates and
/// unknown tokens become replies.
pub async fn handle_update(
    registry: &RegistryService,
    update: InboundUpdate,
) -> RegistryResult<BotAction> {
    match update {
        InboundUpdate::Help { chat_id } => Ok(BotAction::reply(chat_id, HELP_TEXT)),
        InboundUpdate::Start {
            chat_id, payload, ..
        } => {
            let Some(token) = payload.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
                return Ok(BotAction::reply(chat_id, WELCOME_TEXT));
            };
            match registry.resolve(token).await {
                Ok(record) => Ok(BotAction::Deliver {
                    chat_id,
                    file_kind: record.file_kind,
                    file_identifier: record.file_identifier,
                    filename: record.original_filename,
                }),
                Err(RegistryError::NotFound) => Ok(BotAction::reply(chat_id, INVALID_LINK_TEXT)),
                Err(err) => Err(err),
            }
        }
        InboundUpdate::File {
            chat_id,
            sender_id,
            file_kind,
            file_identifier,
            file_unique_id,
            filename,
        } => {
            let submission = Submission {
                sender_id,
                file_kind,
                filename: submitted_filename(file_kind, filename, file_unique_id.as_deref()),
                file_identifier,
            };
            match registry.ingest(submission).await {
                Ok(receipt) => {
                    info!(id = receipt.record.id, "shareable link issued");
                    Ok(BotAction::reply(
                        chat_id,
                        format!("File stored! Your shareable link is:\n{}", receipt.link),
                    ))
                }
                Err(RegistryError::AuthorizationDenied) => Ok(BotAction::reply(
                    chat_id,
                    "Sorry, only the admin can upload files.",
                )),
                Err(RegistryError::DuplicateFile {
                    existing_link: Some(link),
                    ..
                }) => Ok(BotAction::reply(
                    chat_id,
                    format!("This file is already stored. Link:\n{link}"),
                )),
                Err(RegistryError::DuplicateFile { .. }) => {
                    Ok(BotAction::reply(chat_id, "This file is already stored."))
                }
                Err(RegistryError::AllocationCollisionExhausted { attempts }) => {
                    error!(attempts, "could not allocate a token for submission");
                    Ok(BotAction::reply(
                        chat_id,
                        "Error storing file. Please try again.",
                    ))
                }
                Err(err) => Err(err),
            }
        }
    }
}

/// Name to record for a submission. Media sent without a name gets one
/// derived from its kind and the transport's stable file id.
fn submitted_filename(
    kind: FileKind,
    filename: Option<String>,
    file_unique_id: Option<&str>,
) -> Option<String> {
    filename
        .filter(|name| !name.trim().is_empty())
        .or_else(|| {
            let ext = kind.default_extension()?;
            let unique_id = file_unique_id?;
            Some(format!("{kind}_{unique_id}.{ext}"))
        })
}
