//! src/services/record_store.rs
//!
//! RecordStore — durable `FileRecord` persistence backed by SQLite. The store
//! owns every uniqueness guarantee of the registry: `file_identifier` and
//! `unique_token` are UNIQUE on `hosted_files`, and an insert trigger copies
//! each token into `issued_tokens`, which is never pruned, so a deleted
//! record's token can not be handed out again.

use crate::models::file_record::{FileRecord, NewFileRecord};
use chrono::Utc;
use sqlx::{
    QueryBuilder, SqlitePool,
    sqlite::{Sqlite, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::debug;

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_init.sql");

const RECORD_COLUMNS: &str =
    "id, file_identifier, unique_token, file_kind, original_filename, uploader_id, uploaded_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file identifier `{0}` is already registered")]
    DuplicateFileIdentifier(String),
    #[error("token `{0}` has already been issued")]
    TokenTaken(String),
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// RecordStore provides the registry's persistence operations:
/// - Insert a record (single atomic statement, fails on any uniqueness clash)
/// - Look up by token, id or file identifier
/// - List newest-first with an optional filename filter
/// - Hard-delete by id
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone)]
pub struct RecordStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl RecordStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Open (creating if missing) the database at `database_url`.
    ///
    /// WAL lets the bot and admin sides read while the other writes; the busy
    /// timeout queues competing writers instead of failing them.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Create tables, indexes and the token-retirement trigger if missing.
    ///
    /// Every statement is `IF NOT EXISTS`, so running this on each start is safe.
    pub async fn migrate(&self) -> StoreResult<()> {
        debug!("applying registry schema");
        sqlx::raw_sql(SCHEMA_SQL).execute(&*self.db).await?;
        Ok(())
    }

    /// Insert a new record and return it with its assigned id and timestamp.
    ///
    /// The row and its `issued_tokens` entry are written by one statement, so
    /// a failed insert leaves nothing behind.
    pub async fn insert(&self, record: NewFileRecord) -> StoreResult<FileRecord> {
        let sql = format!(
            "INSERT INTO hosted_files (
                file_identifier, unique_token, file_kind, original_filename,
                filename_folded, uploader_id, uploaded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {RECORD_COLUMNS}"
        );

        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(&record.file_identifier)
            .bind(&record.unique_token)
            .bind(record.file_kind)
            .bind(&record.original_filename)
            .bind(record.original_filename.as_deref().map(str::to_lowercase))
            .bind(record.uploader_id)
            .bind(Utc::now())
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match unique_violation_column(&err) {
                Some(UniqueColumn::FileIdentifier) => {
                    StoreError::DuplicateFileIdentifier(record.file_identifier.clone())
                }
                Some(UniqueColumn::Token) => StoreError::TokenTaken(record.unique_token.clone()),
                None => StoreError::Sqlx(err),
            })
    }

    /// Fetch the record currently registered under `token`.
    pub async fn get_by_token(&self, token: &str) -> StoreResult<FileRecord> {
        self.fetch_one_where("unique_token = ?", token).await
    }

    /// Fetch a record by primary key.
    pub async fn get_by_id(&self, id: i64) -> StoreResult<FileRecord> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM hosted_files WHERE id = ?");
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    /// Fetch the record registered for a delivery-side file identifier.
    pub async fn get_by_file_identifier(&self, file_identifier: &str) -> StoreResult<FileRecord> {
        self.fetch_one_where("file_identifier = ?", file_identifier)
            .await
    }

    /// Whether `token` was ever issued, including tokens of deleted records.
    ///
    /// Advisory only: a concurrent insert may take the token right after this
    /// returns `false`. `insert` is the authority.
    pub async fn token_issued(&self, token: &str) -> StoreResult<bool> {
        let issued: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM issued_tokens WHERE token = ?)")
                .bind(token)
                .fetch_one(&*self.db)
                .await?;
        Ok(issued != 0)
    }

    /// List records newest-first.
    ///
    /// With a filter, only records whose `original_filename` contains it are
    /// returned. Both sides are compared Unicode-lowercased, and the filter
    /// is a plain substring with no wildcards. An empty filter behaves like
    /// no filter.
    pub async fn list(&self, filename_filter: Option<&str>) -> StoreResult<Vec<FileRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder.push(RECORD_COLUMNS);
        builder.push(" FROM hosted_files");

        if let Some(filter) = filename_filter.filter(|f| !f.is_empty()) {
            builder.push(" WHERE instr(filename_folded, ");
            builder.push_bind(filter.to_lowercase());
            builder.push(") > 0");
        }

        // ids are assigned at insertion, so descending id is newest-first
        builder.push(" ORDER BY id DESC");

        let rows: Vec<FileRecord> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(rows)
    }

    /// Total number of live records.
    pub async fn count(&self) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hosted_files")
            .fetch_one(&*self.db)
            .await?;
        Ok(total)
    }

    /// Hard-delete a record. Its token stays in `issued_tokens`.
    ///
    /// Returns NotFound when no row with `id` exists.
    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM hosted_files WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn fetch_one_where(&self, predicate: &str, value: &str) -> StoreResult<FileRecord> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM hosted_files WHERE {predicate}");
        sqlx::query_as::<_, FileRecord>(&sql)
            .bind(value)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StoreError::NotFound,
                other => StoreError::Sqlx(other),
            })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum UniqueColumn {
    FileIdentifier,
    Token,
}

/// Classify a SQLx error as a unique constraint violation on one of the
/// registry's unique columns.
///
/// SQLite reports the failing column as `UNIQUE constraint failed: table.column`.
fn unique_violation_column(err: &sqlx::Error) -> Option<UniqueColumn> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let message = db_err.message().to_ascii_lowercase();
    if !message.contains("unique") {
        return None;
    }
    if message.contains("file_identifier") {
        Some(UniqueColumn::FileIdentifier)
    } else if message.contains("unique_token") || message.contains("issued_tokens") {
        Some(UniqueColumn::Token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file_record::FileKind;

    async fn memory_store() -> RecordStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = RecordStore::new(Arc::new(pool));
        store.migrate().await.unwrap();
        store
    }

    fn new_record(file_identifier: &str, token: &str, filename: Option<&str>) -> NewFileRecord {
        NewFileRecord {
            file_identifier: file_identifier.to_string(),
            unique_token: token.to_string(),
            file_kind: FileKind::Document,
            original_filename: filename.map(str::to_string),
            uploader_id: 7,
        }
    }

    #[tokio::test]
    async fn insert_assigns_monotonic_ids() {
        let store = memory_store().await;
        let a = store.insert(new_record("f1", "t1", None)).await.unwrap();
        let b = store.insert(new_record("f2", "t2", None)).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.file_kind, FileKind::Document);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_file_identifier() {
        let store = memory_store().await;
        store.insert(new_record("f1", "t1", None)).await.unwrap();
        let err = store.insert(new_record("f1", "t2", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateFileIdentifier(id) if id == "f1"));
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(!store.token_issued("t2").await.unwrap());
    }

    #[tokio::test]
    async fn deleted_tokens_stay_issued() {
        let store = memory_store().await;
        let rec = store.insert(new_record("f1", "t1", None)).await.unwrap();
        store.delete(rec.id).await.unwrap();

        assert!(matches!(
            store.get_by_token("t1").await,
            Err(StoreError::NotFound)
        ));
        assert!(store.token_issued("t1").await.unwrap());

        let err = store.insert(new_record("f2", "t1", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::TokenTaken(t) if t == "t1"));
    }

    #[tokio::test]
    async fn delete_missing_id_is_not_found() {
        let store = memory_store().await;
        assert!(matches!(store.delete(42).await, Err(StoreError::NotFound)));
        assert!(matches!(store.get_by_id(42).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn list_filter_treats_wildcards_literally() {
        let store = memory_store().await;
        store
            .insert(new_record("f1", "t1", Some("100%_done.txt")))
            .await
            .unwrap();
        store
            .insert(new_record("f2", "t2", Some("1000 done.txt")))
            .await
            .unwrap();

        let hits = store.list(Some("0%_")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].unique_token, "t1");

        let all = store.list(Some("")).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].unique_token, "t2");
    }

    #[tokio::test]
    async fn list_filter_folds_non_ascii_case() {
        let store = memory_store().await;
        store
            .insert(new_record("f1", "t1", Some("Отчёт_2024.pdf")))
            .await
            .unwrap();
        store
            .insert(new_record("f2", "t2", Some("ÉTÉ.pdf")))
            .await
            .unwrap();
        store.insert(new_record("f3", "t3", None)).await.unwrap();

        let cyrillic = store.list(Some("отчёт")).await.unwrap();
        assert_eq!(cyrillic.len(), 1);
        assert_eq!(cyrillic[0].unique_token, "t1");

        let latin = store.list(Some("été")).await.unwrap();
        assert_eq!(latin.len(), 1);
        assert_eq!(latin[0].unique_token, "t2");

        assert_eq!(store.list(Some("ОТЧЁТ_2024")).await.unwrap().len(), 1);
    }
}
