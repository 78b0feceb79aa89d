use std::time::Instant;

use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::db::models::DocumentMetadata;
use crate::db::queries;
use crate::domain::{
    BatchProcessRequest, BatchProcessResponse, ProcessOptions, ProcessingStatus, QaRequest,
    QaResponse, SimplifiedDocument,
};
use crate::error::ApiError;
use crate::simplifier::{self, SimplifyError};
use crate::state::AppState;

/// `POST /api/v1/documents/{id}/process`
pub async fn process_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(options): Json<ProcessOptions>,
) -> Result<Json<SimplifiedDocument>, ApiError> {
    let document = run_processing(&state, document_id, &options).await?;
    Ok(Json(document))
}

/// The full processing run for one document. Shared by the single and batch
/// endpoints. Any failure after the metadata lookup deterministically moves
/// the document to `failed` with its error recorded; no partial result is
/// ever persisted.
pub async fn run_processing(
    state: &AppState,
    document_id: Uuid,
    options: &ProcessOptions,
) -> Result<SimplifiedDocument, ApiError> {
    let metadata = queries::get_document(&state.db_pool, document_id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::NotFound("document not found".into()))?;

    // Re-serve the stored result instead of paying for another model call.
    // A request with a different simplification level reprocesses.
    if metadata.processing_status() == Some(ProcessingStatus::Completed) {
        if let Some(stored) = state.blobs.read_simplified(document_id).await? {
            if stored.simplification_level == options.simplification_level {
                tracing::info!("returning stored simplification for {}", document_id);
                return Ok(shape_response(stored, options.include_original));
            }
        }
    }

    // Non-fatal: processing continues even if the status write is lost.
    if let Err(e) =
        queries::update_status(&state.db_pool, document_id, ProcessingStatus::Processing, None)
            .await
    {
        tracing::warn!("failed to mark {} as processing: {}", document_id, e);
    }

    let started = Instant::now();
    let outcome = simplify_and_persist(state, &metadata, options).await;

    match outcome {
        Ok(document) => {
            state.analytics.track_document_processing(
                document_id,
                started.elapsed().as_secs_f64(),
                document.simplification_level.as_str(),
                document.confidence_score,
            );
            Ok(document)
        }
        Err(e) => {
            let reason = e.to_string();
            if let Err(update_err) = queries::update_status(
                &state.db_pool,
                document_id,
                ProcessingStatus::Failed,
                Some(&reason),
            )
            .await
            {
                tracing::error!("failed to mark {} as failed: {}", document_id, update_err);
            }
            Err(e)
        }
    }
}

async fn simplify_and_persist(
    state: &AppState,
    metadata: &DocumentMetadata,
    options: &ProcessOptions,
) -> Result<SimplifiedDocument, ApiError> {
    let document_type = metadata.document_type().ok_or_else(|| {
        ApiError::Extraction(format!(
            "documents of type {} cannot be processed",
            metadata.file_type
        ))
    })?;

    let data = state.blobs.read(&metadata.storage_path).await?;

    let extraction = state
        .pipeline
        .extract(document_type, &data)
        .await
        .map_err(|e| ApiError::Extraction(e.to_string()))?;

    let outcome = state
        .simplifier
        .simplify(
            &extraction.text,
            options.simplification_level,
            options.target_audience,
        )
        .await
        .map_err(|e| match e {
            SimplifyError::Upstream(m) => ApiError::Upstream(m),
            SimplifyError::Malformed(m) => ApiError::Unprocessable(m),
        })?;

    let word_count_original = simplifier::word_count(&extraction.text);
    let word_count_simplified = simplifier::word_count(&outcome.content.summary);

    let document = SimplifiedDocument {
        document_id: metadata.document_id,
        original_filename: metadata.filename.clone(),
        summary: outcome.content.summary,
        key_points: outcome.content.key_points,
        important_terms: outcome.content.important_terms,
        deadlines_obligations: outcome.content.deadlines_obligations,
        warnings: outcome.content.warnings,
        next_steps: outcome.content.next_steps,
        processing_timestamp: Utc::now(),
        simplification_level: options.simplification_level,
        confidence_score: outcome.confidence_score,
        original_text: options.include_original.then(|| extraction.text.clone()),
        word_count_original,
        word_count_simplified,
        reading_level: outcome.reading_level.to_string(),
    };

    let processed_path = state.blobs.put_simplified(&document).await?;
    queries::mark_completed(
        &state.db_pool,
        metadata.document_id,
        &processed_path,
        extraction.method,
        extraction.ocr_confidence,
    )
    .await
    .map_err(ApiError::storage)?;

    Ok(document)
}

/// Applies `include_original` when re-serving a stored document.
fn shape_response(mut document: SimplifiedDocument, include_original: bool) -> SimplifiedDocument {
    if !include_original {
        document.original_text = None;
    }
    document
}

/// `GET /api/v1/documents/{id}`. A simplified document is only visible
/// while its metadata says `completed`; a failed run has no result.
pub async fn get_simplified_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<SimplifiedDocument>, ApiError> {
    let metadata = queries::get_document(&state.db_pool, document_id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::NotFound("document not found".into()))?;
    if metadata.processing_status() != Some(ProcessingStatus::Completed) {
        return Err(ApiError::NotFound("simplified document not found".into()));
    }

    let document = state
        .blobs
        .read_simplified(document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("simplified document not found".into()))?;

    state.analytics.track_document_view(document_id);
    Ok(Json(document))
}

/// `GET /api/v1/documents/{id}/metadata`
pub async fn get_document_metadata(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentMetadata>, ApiError> {
    let metadata = queries::get_document(&state.db_pool, document_id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::NotFound("document metadata not found".into()))?;
    Ok(Json(metadata))
}

/// `POST /api/v1/documents/batch/process`. Documents are processed
/// sequentially; one failure never aborts the rest of the batch.
pub async fn batch_process_documents(
    State(state): State<AppState>,
    Json(request): Json<BatchProcessRequest>,
) -> Result<Json<BatchProcessResponse>, ApiError> {
    if request.document_ids.is_empty() {
        return Err(ApiError::Validation("document_ids must not be empty".into()));
    }

    let options = ProcessOptions {
        simplification_level: request.simplification_level,
        target_audience: request.target_audience,
        include_original: request.include_original,
    };

    let started = Instant::now();
    let mut results = Vec::new();
    let mut errors = Vec::new();

    for &document_id in &request.document_ids {
        match run_processing(&state, document_id, &options).await {
            Ok(document) => results.push(document),
            Err(e) => {
                tracing::warn!("batch item {} failed: {}", document_id, e);
                errors.push(e.envelope());
            }
        }
    }

    Ok(Json(BatchProcessResponse {
        batch_id: Uuid::new_v4(),
        total_documents: request.document_ids.len(),
        processed_documents: results.len(),
        failed_documents: errors.len(),
        results,
        errors,
        processing_time: started.elapsed().as_secs_f64(),
    }))
}

/// `DELETE /api/v1/documents/{id}`
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    queries::get_document(&state.db_pool, document_id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::NotFound("document not found".into()))?;

    state.blobs.delete_document(document_id).await?;
    queries::delete_document(&state.db_pool, document_id)
        .await
        .map_err(ApiError::storage)?;

    state.analytics.track_document_deletion(document_id);

    Ok(Json(json!({ "message": "Document deleted successfully" })))
}

/// `POST /api/v1/documents/{id}/qa`
pub async fn document_qa(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<QaRequest>,
) -> Result<Json<QaResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::Validation("question must not be empty".into()));
    }

    let metadata = queries::get_document(&state.db_pool, document_id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::NotFound("document not found".into()))?;

    let document_type = metadata.document_type().ok_or_else(|| {
        ApiError::Extraction(format!(
            "documents of type {} cannot be processed",
            metadata.file_type
        ))
    })?;

    let data = state.blobs.read(&metadata.storage_path).await?;
    let extraction = state
        .pipeline
        .extract(document_type, &data)
        .await
        .map_err(|e| ApiError::Extraction(e.to_string()))?;

    let (answer, confidence_score) = state
        .simplifier
        .answer_question(&extraction.text, &request.question, request.target_audience)
        .await
        .map_err(|e| match e {
            SimplifyError::Upstream(m) => ApiError::Upstream(m),
            SimplifyError::Malformed(m) => ApiError::Unprocessable(m),
        })?;

    state
        .analytics
        .track_document_qa(document_id, &request.question, confidence_score);

    Ok(Json(QaResponse {
        document_id,
        question: request.question,
        answer,
        confidence_score,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SimplificationLevel;
    use std::collections::BTreeMap;

    fn sample_document(original_text: Option<String>) -> SimplifiedDocument {
        SimplifiedDocument {
            document_id: Uuid::new_v4(),
            original_filename: "lease.pdf".to_string(),
            summary: "A lease.".to_string(),
            key_points: vec!["Pay rent".to_string()],
            important_terms: BTreeMap::new(),
            deadlines_obligations: vec![],
            warnings: vec![],
            next_steps: vec![],
            processing_timestamp: Utc::now(),
            simplification_level: SimplificationLevel::Standard,
            confidence_score: 0.8,
            original_text,
            word_count_original: 120,
            word_count_simplified: 2,
            reading_level: "intermediate".to_string(),
        }
    }

    #[test]
    fn test_shape_response_strips_original_text() {
        let document = sample_document(Some("full text".to_string()));
        let shaped = shape_response(document.clone(), false);
        assert!(shaped.original_text.is_none());

        let kept = shape_response(document, true);
        assert_eq!(kept.original_text.as_deref(), Some("full text"));
    }
}
