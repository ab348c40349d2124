//! Shared fixtures for integration tests.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.

use file_link_registry::{
    models::file_record::FileKind,
    services::{
        auth::{AdminGate, PlaintextPasscode},
        record_store::RecordStore,
        registry_service::{LinkTemplate, RegistryService, Submission},
        token_allocator::{RandomTokens, TokenAllocator, TokenGenerator},
    },
    state::AppState,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

pub const ADMIN_ID: i64 = 1001;
#[allow(dead_code)]
pub const STRANGER_ID: i64 = 2002;
pub const BOT_USERNAME: &str = "nexus_files_bot";
#[allow(dead_code)]
pub const PASSCODE: &str = "let-me-in";

/// Fresh in-memory store with the schema applied.
pub async fn memory_store() -> RecordStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    let store = RecordStore::new(Arc::new(pool));
    store.migrate().await.expect("apply schema");
    store
}

/// Hands out queued tokens first, then random ones.
#[allow(dead_code)]
#[derive(Default)]
pub struct ScriptedTokens {
    queue: Mutex<VecDeque<String>>,
}

#[allow(dead_code)]
impl ScriptedTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(tokens.into_iter().map(Into::into).collect()),
        }
    }
}

impl TokenGenerator for ScriptedTokens {
    fn generate(&self) -> String {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomTokens.generate())
    }
}

/// Always returns the same token.
#[allow(dead_code)]
pub struct FixedToken(pub &'static str);

impl TokenGenerator for FixedToken {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

pub fn registry_with(store: RecordStore, generator: Arc<dyn TokenGenerator>) -> RegistryService {
    RegistryService::new(
        store,
        TokenAllocator::new(generator),
        AdminGate::new([ADMIN_ID]),
        LinkTemplate::new(BOT_USERNAME),
    )
}

#[allow(dead_code)]
pub fn registry(store: RecordStore) -> RegistryService {
    registry_with(store, Arc::new(RandomTokens))
}

#[allow(dead_code)]
pub fn submission(file_identifier: &str, filename: Option<&str>) -> Submission {
    Submission {
        sender_id: ADMIN_ID,
        file_kind: FileKind::Document,
        file_identifier: file_identifier.to_string(),
        filename: filename.map(str::to_string),
    }
}

/// Handler state with a plaintext passcode and no webhook secret.
#[allow(dead_code)]
pub async fn app_state() -> AppState {
    let registry = registry(memory_store().await);
    AppState::new(registry).with_passcode(Arc::new(PlaintextPasscode::new(PASSCODE)))
}

/// Extract the token from a `https://t.me/<bot>?start=<token>` link.
#[allow(dead_code)]
pub fn token_of(link: &str) -> &str {
    link.rsplit_once("?start=").map(|(_, t)| t).expect("deep link")
}
