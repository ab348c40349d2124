//! src/services/registry_service.rs
//!
//! RegistryService — the operations both front-ends share: ingestion,
//! resolution, deletion and search. It composes the admin gate, the token
//! allocator and the record store, and holds no mutable state of its own;
//! every guarantee about concurrent callers comes from the store.

use crate::{
    models::file_record::{FileKind, FileRecord, NewFileRecord},
    services::{
        auth::{AdminGate, Caller},
        record_store::{RecordStore, StoreError},
        token_allocator::TokenAllocator,
    },
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("caller is not allowed to perform this action")]
    AuthorizationDenied,
    #[error("file `{file_identifier}` is already registered")]
    DuplicateFile {
        file_identifier: String,
        /// Link of the record already holding the file, if it could be read back.
        existing_link: Option<String>,
    },
    #[error("no free token found after {attempts} attempts")]
    AllocationCollisionExhausted { attempts: usize },
    /// A token was claimed by a concurrent insert. `ingest` reallocates on
    /// this, so it only surfaces from direct store conversions.
    #[error("token `{0}` was taken by a concurrent insert")]
    TokenConflict(String),
    #[error("record not found")]
    NotFound,
    #[error("record store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RegistryError::NotFound,
            StoreError::DuplicateFileIdentifier(file_identifier) => RegistryError::DuplicateFile {
                file_identifier,
                existing_link: None,
            },
            StoreError::TokenTaken(token) => RegistryError::TokenConflict(token),
            StoreError::Sqlx(err) => RegistryError::StoreUnavailable(err),
        }
    }
}

/// Builds shareable deep links for a bot.
#[derive(Clone, Debug)]
pub struct LinkTemplate {
    bot_username: String,
}

impl LinkTemplate {
    pub fn new(bot_username: impl Into<String>) -> Self {
        let bot_username = bot_username.into();
        Self {
            bot_username: bot_username.trim_start_matches('@').to_string(),
        }
    }

    pub fn link_for(&self, token: &str) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, token)
    }
}

/// A file submitted for registration.
#[derive(Clone, Debug)]
pub struct Submission {
    pub sender_id: i64,
    pub file_kind: FileKind,
    pub file_identifier: String,
    pub filename: Option<String>,
}

/// Outcome of a successful ingestion.
#[derive(Clone, Debug, Serialize)]
pub struct IngestReceipt {
    pub link: String,
    pub record: FileRecord,
}

/// Result of a listing or search.
///
/// `total` counts every record in the store, so an empty `records` with a
/// non-zero `total` means "no match", while `total == 0` means "nothing
/// registered yet".
#[derive(Clone, Debug, Serialize)]
pub struct SearchResults {
    pub query: Option<String>,
    pub records: Vec<FileRecord>,
    pub total: i64,
}

impl SearchResults {
    pub fn registry_is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn no_match(&self) -> bool {
        self.records.is_empty() && self.total > 0
    }
}

#[derive(Clone)]
pub struct RegistryService {
    store: RecordStore,
    allocator: TokenAllocator,
    gate: AdminGate,
    links: LinkTemplate,
}

impl RegistryService {
    pub fn new(
        store: RecordStore,
        allocator: TokenAllocator,
        gate: AdminGate,
        links: LinkTemplate,
    ) -> Self {
        Self {
            store,
            allocator,
            gate,
            links,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn links(&self) -> &LinkTemplate {
        &self.links
    }

    /// Register a file and return its shareable link.
    ///
    /// Either exactly one record is created and its link returned, or
    /// nothing is written and a specific error comes back. An insert that
    /// loses a token race re-enters allocation; all attempts share the
    /// allocator's bound.
    pub async fn ingest(&self, submission: Submission) -> RegistryResult<IngestReceipt> {
        if !self.gate.allows(submission.sender_id) {
            warn!(
                sender_id = submission.sender_id,
                "unauthorized file submission"
            );
            return Err(RegistryError::AuthorizationDenied);
        }

        match self
            .store
            .get_by_file_identifier(&submission.file_identifier)
            .await
        {
            Ok(existing) => {
                return Err(RegistryError::DuplicateFile {
                    file_identifier: submission.file_identifier,
                    existing_link: Some(self.links.link_for(&existing.unique_token)),
                });
            }
            Err(StoreError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        let max_attempts = self.allocator.max_attempts();
        let mut used = 0;
        while used < max_attempts {
            let Some((token, spent)) = self
                .allocator
                .allocate(&self.store, max_attempts - used)
                .await?
            else {
                break;
            };
            used += spent;

            let new_record = NewFileRecord {
                file_identifier: submission.file_identifier.clone(),
                unique_token: token,
                file_kind: submission.file_kind,
                original_filename: submission.filename.clone(),
                uploader_id: submission.sender_id,
            };

            match self.store.insert(new_record).await {
                Ok(record) => {
                    info!(
                        id = record.id,
                        uploader_id = record.uploader_id,
                        kind = %record.file_kind,
                        filename = ?record.original_filename,
                        "file registered"
                    );
                    return Ok(IngestReceipt {
                        link: self.links.link_for(&record.unique_token),
                        record,
                    });
                }
                Err(StoreError::TokenTaken(_)) => {
                    warn!(attempt = used, "token taken at insert, reallocating");
                }
                Err(StoreError::DuplicateFileIdentifier(file_identifier)) => {
                    return Err(self.duplicate(file_identifier).await);
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(attempts = max_attempts, "token allocation exhausted");
        Err(RegistryError::AllocationCollisionExhausted {
            attempts: max_attempts,
        })
    }

    /// Map a deep-link token to its record.
    pub async fn resolve(&self, token: &str) -> RegistryResult<FileRecord> {
        let record = self.store.get_by_token(token).await?;
        debug!(id = record.id, "token resolved");
        Ok(record)
    }

    /// Fetch a single record for the admin surface.
    pub async fn get(&self, id: i64) -> RegistryResult<FileRecord> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Remove a record. Its token is retired for good; the delivery side's
    /// bytes are not touched.
    pub async fn delete(&self, caller: &Caller, id: i64) -> RegistryResult<()> {
        if !self.gate.admits(caller) {
            warn!(?caller, id, "unauthorized delete attempt");
            return Err(RegistryError::AuthorizationDenied);
        }
        self.store.delete(id).await?;
        info!(id, "file record deleted");
        Ok(())
    }

    /// Case-insensitive filename search, newest first. A missing or blank
    /// query lists everything; any other query is matched exactly as typed.
    pub async fn search(&self, query: Option<&str>) -> RegistryResult<SearchResults> {
        let query = query.filter(|q| !q.trim().is_empty());
        let records = self.store.list(query).await?;
        let total = self.store.count().await?;
        Ok(SearchResults {
            query: query.map(str::to_string),
            records,
            total,
        })
    }

    async fn duplicate(&self, file_identifier: String) -> RegistryError {
        let existing_link = self
            .store
            .get_by_file_identifier(&file_identifier)
            .await
            .ok()
            .map(|record| self.links.link_for(&record.unique_token));
        RegistryError::DuplicateFile {
            file_identifier,
            existing_link,
        }
    }
}
