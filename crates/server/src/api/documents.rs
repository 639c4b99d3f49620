//! Document and conversion API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use convertino_core::document::UnknownFormat;
use convertino_core::{
    ConversionFormat, DocumentId, DocumentSnapshot, LibraryError, PathListPicker,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for importing documents
#[derive(Debug, Deserialize)]
pub struct ImportDocumentsBody {
    /// Candidate source paths on the server host
    pub paths: Vec<PathBuf>,
}

/// Response for listing or importing documents
#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentSnapshot>,
    pub total: usize,
}

impl DocumentsResponse {
    fn new(documents: Vec<DocumentSnapshot>) -> Self {
        Self {
            total: documents.len(),
            documents,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct DocumentErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<DocumentErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(DocumentErrorResponse {
            error: error.into(),
        }),
    )
}

impl From<LibraryError> for DocumentErrorResponse {
    fn from(e: LibraryError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

fn library_error(e: LibraryError) -> ApiError {
    let status = match &e {
        LibraryError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
        LibraryError::Manager(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(DocumentErrorResponse::from(e)))
}

fn parse_id(id: &str) -> Result<DocumentId, ApiError> {
    id.parse()
        .map_err(|_| api_error(StatusCode::NOT_FOUND, format!("Document not found: {}", id)))
}

fn parse_format(format: &str) -> Result<ConversionFormat, ApiError> {
    format
        .parse()
        .map_err(|e: UnknownFormat| api_error(StatusCode::NOT_FOUND, e.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// List all documents in import order
pub async fn list_documents(State(state): State<Arc<AppState>>) -> Json<DocumentsResponse> {
    let documents = state
        .library()
        .documents()
        .await
        .iter()
        .map(|d| d.snapshot())
        .collect();

    Json(DocumentsResponse::new(documents))
}

/// Import documents from candidate paths
///
/// Candidates go through the configured picker constraints first. Responds
/// 400 when nothing could be imported.
pub async fn import_documents(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImportDocumentsBody>,
) -> Result<(StatusCode, Json<DocumentsResponse>), ApiError> {
    let request = state.pick_request();
    let picker = PathListPicker::new(body.paths);

    let created = state.library().import_picked(&picker, &request).await;
    if created.is_empty() {
        debug!(extension = %request.allowed_extension, "Import request produced no documents");
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "No importable .{} files in request",
                request.allowed_extension
            ),
        ));
    }

    let documents = created.iter().map(|d| d.snapshot()).collect();
    Ok((StatusCode::CREATED, Json(DocumentsResponse::new(documents))))
}

/// Get a document by ID
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentSnapshot>, ApiError> {
    let id = parse_id(&id)?;

    match state.library().get(id).await {
        Ok(document) => Ok(Json(document.snapshot())),
        Err(e) => Err(library_error(e)),
    }
}

/// Delete a document, cancelling its conversions
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;

    state
        .library()
        .delete(id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(library_error)
}

/// Start (or restart) a conversion
pub async fn start_conversion(
    State(state): State<Arc<AppState>>,
    Path((id, format)): Path<(String, String)>,
) -> Result<(StatusCode, Json<DocumentSnapshot>), ApiError> {
    let id = parse_id(&id)?;
    let format = parse_format(&format)?;

    match state.library().start_conversion(id, format).await {
        Ok(document) => Ok((StatusCode::ACCEPTED, Json(document.snapshot()))),
        Err(e) => Err(library_error(e)),
    }
}

/// Cancel a conversion; the format is idle afterwards
pub async fn cancel_conversion(
    State(state): State<Arc<AppState>>,
    Path((id, format)): Path<(String, String)>,
) -> Result<Json<DocumentSnapshot>, ApiError> {
    let id = parse_id(&id)?;
    let format = parse_format(&format)?;

    match state.library().cancel_conversion(id, format).await {
        Ok(document) => Ok(Json(document.snapshot())),
        Err(e) => Err(library_error(e)),
    }
}
