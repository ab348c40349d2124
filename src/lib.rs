//! File link registry.
//!
//! Admins register files held by a messaging service under opaque tokens and
//! share `https://t.me/<bot>?start=<token>` links; anyone holding a link can
//! resolve it back to the file. The bytes stay with the messaging service;
//! this crate only keeps the token → file identifier mapping in SQLite.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use anyhow::{Context, Result};
use config::AppConfig;
use services::{
    auth::{AdminGate, passcode_verifier},
    record_store::RecordStore,
    registry_service::{LinkTemplate, RegistryService},
    token_allocator::TokenAllocator,
};
use state::AppState;

/// Wire the registry and handler state from configuration.
pub fn build_state(cfg: &AppConfig, store: RecordStore) -> Result<AppState> {
    let registry = RegistryService::new(
        store,
        TokenAllocator::default(),
        AdminGate::new(cfg.admin_ids.iter().copied()),
        LinkTemplate::new(&cfg.bot_username),
    );

    let mut state = AppState::new(registry);

    match cfg.admin_passcode.as_deref() {
        Some(passcode) => {
            if !passcode.starts_with("$argon2") {
                tracing::warn!(
                    "admin passcode is stored as plaintext; use --hash-passcode to generate a hash"
                );
            }
            let verifier = passcode_verifier(passcode)
                .map_err(|err| anyhow::anyhow!("{err}"))
                .context("parsing admin passcode hash")?;
            state = state.with_passcode(verifier);
        }
        None => tracing::warn!("no admin passcode configured; admin API is disabled"),
    }

    match cfg.webhook_secret.as_deref() {
        Some(secret) => state = state.with_webhook_secret(secret),
        None => tracing::warn!("no webhook secret configured; bot updates are not authenticated"),
    }

    Ok(state)
}
