//! Shared state handed to every handler.

use crate::services::{auth::PasscodeVerifier, registry_service::RegistryService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: RegistryService,

    /// Dashboard passcode check. `None` disables the admin API.
    pub passcode: Option<Arc<dyn PasscodeVerifier>>,

    /// Value the bot transport must send in `X-Telegram-Bot-Api-Secret-Token`.
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(registry: RegistryService) -> Self {
        Self {
            registry,
            passcode: None,
            webhook_secret: None,
        }
    }

    pub fn with_passcode(mut self, verifier: Arc<dyn PasscodeVerifier>) -> Self {
        self.passcode = Some(verifier);
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<Arc<str>>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }
}
