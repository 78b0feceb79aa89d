use axum::extract::{Multipart, State};
use axum::response::Json;
use chrono::Utc;
use uuid::Uuid;

use super::validation::{self, ValidationFailure};
use crate::auth::MaybeUser;
use crate::db::models::DocumentMetadata;
use crate::db::queries;
use crate::domain::{DocumentUploadResponse, ProcessingStatus};
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/v1/documents/upload`. Accepts one multipart `file` part,
/// re-runs the validator server-side, stores the blob and the metadata row,
/// and records the upload event. Processing is a separate, explicit call.
pub async fn handle_document_upload(
    State(state): State<AppState>,
    user: MaybeUser,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, ApiError> {
    let mut file_data = None;
    let mut file_name = String::new();
    let mut declared_mime: Option<String> = None;

    // Parse multipart data
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("failed to read multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().unwrap_or("").to_string();
            declared_mime = field.content_type().map(|m| m.to_string());

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("failed to read file: {e}")))?;
            file_data = Some(data);
        }
    }

    let file_bytes = file_data
        .ok_or_else(|| ApiError::Validation("multipart form must include a file part".into()))?;

    let mime = validation::resolve_mime(&file_name, declared_mime.as_deref());
    validation::validate_upload(&file_name, &mime, file_bytes.len()).map_err(|e| {
        if matches!(e, ValidationFailure::TooLarge { .. }) {
            ApiError::TooLarge(e.to_string())
        } else {
            ApiError::Validation(e.to_string())
        }
    })?;

    let document_id = Uuid::new_v4();
    let document_type = validation::document_type_for(&file_name, &mime);
    let user_id = user.0.map(|claims| claims.sub);

    let storage_path = state
        .blobs
        .put_upload(document_id, &file_name, &file_bytes)
        .await?;

    let metadata = DocumentMetadata {
        document_id,
        filename: file_name.clone(),
        file_type: document_type.as_str().to_string(),
        mime_type: Some(mime),
        file_size: file_bytes.len() as i64,
        upload_timestamp: Utc::now(),
        processing_timestamp: None,
        status: ProcessingStatus::Uploaded.as_str().to_string(),
        user_id,
        extraction_method: None,
        ocr_confidence: None,
        language_detected: None,
        storage_path,
        processed_path: None,
        error_message: None,
    };

    queries::create_document(&state.db_pool, &metadata)
        .await
        .map_err(ApiError::storage)?;

    state.analytics.track_document_upload(
        document_id,
        user_id,
        metadata.file_size,
        &metadata.file_type,
    );

    tracing::info!(
        "uploaded document {} ({}, {} bytes)",
        document_id,
        metadata.file_type,
        metadata.file_size
    );

    Ok(Json(DocumentUploadResponse {
        document_id,
        filename: file_name,
        file_type: document_type,
        file_size: metadata.file_size,
        upload_timestamp: metadata.upload_timestamp,
        status: ProcessingStatus::Uploaded,
        message: "Document uploaded successfully".to_string(),
    }))
}
