use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart, TypedMultipartError};
use bytes::Bytes;
use common::{
    error::AppError,
    storage::types::document::{DocumentId, DocumentSummary},
    utils::viewer::PageCursor,
};
use ingestion_pipeline::{utils::pdf::page_count, DocumentUpload};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

/// Name given to uploads that arrive without a file name.
const UNNAMED_UPLOAD: &str = "document.pdf";

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    // Bounded by the router's body limit.
    #[form_data(limit = "unlimited")]
    pub file: FieldData<Bytes>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

pub async fn list_documents(
    State(state): State<ApiState>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    Ok(Json(state.store.list_summaries().await?))
}

pub async fn upload_document(
    State(state): State<ApiState>,
    input: Result<TypedMultipart<UploadParams>, TypedMultipartError>,
) -> Result<impl IntoResponse, ApiError> {
    let TypedMultipart(UploadParams { file }) = input?;

    let file_name = file
        .metadata
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNNAMED_UPLOAD.to_string());
    let upload = DocumentUpload::new(file_name, file.metadata.content_type, file.contents);

    info!(
        file_name = %upload.file_name,
        media_type = upload.media_type.as_deref().unwrap_or("none"),
        bytes = upload.bytes.len(),
        "Received document upload"
    );

    let id = state.ingestion.ingest(upload).await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn get_document(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentSummary>, ApiError> {
    Ok(Json(state.store.get_summary(DocumentId::from(id)).await?))
}

pub async fn get_document_content(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.store.get(DocumentId::from(id)).await?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        document.name.replace(['"', '\\', '\r', '\n'], "_")
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.content,
    ))
}

pub async fn delete_document(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(DocumentId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Page position for a viewer, clamped to the document's page range.
pub async fn get_page(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageCursor>, ApiError> {
    let document = state.store.get(DocumentId::from(id)).await?;

    let count = tokio::task::spawn_blocking(move || page_count(&document.content))
        .await
        .map_err(AppError::from)??;

    Ok(Json(PageCursor::at(count, query.page.unwrap_or(1))))
}
