//! Administration front-end: list, search, inspect and delete registrations.
//!
//! Every route sits behind [`require_dashboard`], which checks the bearer
//! passcode against the configured verifier and attaches a
//! [`DashboardSession`] to the request.

use crate::{
    errors::AppError,
    models::file_record::{FileKind, FileRecord},
    services::{
        auth::{Caller, DashboardSession},
        registry_service::LinkTemplate,
    },
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Query params accepted by `GET /admin/files`.
#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileView {
    pub id: i64,
    pub file_identifier: String,
    pub unique_token: String,
    pub link: String,
    pub file_kind: FileKind,
    pub original_filename: Option<String>,
    pub uploader_id: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl FileView {
    fn new(record: FileRecord, links: &LinkTemplate) -> Self {
        Self {
            link: links.link_for(&record.unique_token),
            id: record.id,
            file_identifier: record.file_identifier,
            unique_token: record.unique_token,
            file_kind: record.file_kind,
            original_filename: record.original_filename,
            uploader_id: record.uploader_id,
            uploaded_at: record.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub search: Option<String>,
    /// Records in the whole registry, regardless of the search.
    pub total: i64,
    pub files: Vec<FileView>,
}

/// Middleware guarding `/admin/*`.
///
/// Answers 503 when no passcode is configured and 401 when the bearer value
/// does not verify.
pub async fn require_dashboard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(verifier) = state.passcode.as_deref() else {
        return Err(AppError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "admin dashboard is not configured",
        ));
    };

    let session = extract_bearer(&req)
        .and_then(|candidate| DashboardSession::verify(verifier, candidate))
        .ok_or_else(|| {
            warn!("rejected dashboard request with invalid passcode");
            AppError::unauthorized("invalid passcode")
        })?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

/// `GET /admin/files?search=` — newest first.
pub async fn list_files(
    State(state): State<AppState>,
    Query(q): Query<ListFilesQuery>,
) -> Result<Json<ListFilesResponse>, AppError> {
    let results = state.registry.search(q.search.as_deref()).await?;
    let links = state.registry.links();

    Ok(Json(ListFilesResponse {
        search: results.query,
        total: results.total,
        files: results
            .records
            .into_iter()
            .map(|record| FileView::new(record, links))
            .collect(),
    }))
}

/// `GET /admin/files/{id}`
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FileView>, AppError> {
    let record = state.registry.get(id).await?;
    Ok(Json(FileView::new(record, state.registry.links())))
}

/// `DELETE /admin/files/{id}` — removes the mapping only; the stored bytes
/// stay wherever the messaging side keeps them.
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(session): Extension<DashboardSession>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state
        .registry
        .delete(&Caller::Dashboard(session), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Extract the bearer credential. The scheme name is case-insensitive.
fn extract_bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            if v.len() >= 7 && v[..7].eq_ignore_ascii_case("bearer ") {
                Some(&v[7..])
            } else {
                None
            }
        })
}
