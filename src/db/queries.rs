use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::*;
use crate::domain::ProcessingStatus;

pub async fn create_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    full_name: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (user_id, email, password_hash, full_name)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .fetch_one(pool)
    .await
}

pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn create_document(pool: &PgPool, doc: &DocumentMetadata) -> Result<()> {
    sqlx::query(
        "INSERT INTO documents (document_id, filename, file_type, mime_type, file_size,
                                upload_timestamp, status, user_id, storage_path)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(doc.document_id)
    .bind(&doc.filename)
    .bind(&doc.file_type)
    .bind(&doc.mime_type)
    .bind(doc.file_size)
    .bind(doc.upload_timestamp)
    .bind(&doc.status)
    .bind(doc.user_id)
    .bind(&doc.storage_path)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_document(pool: &PgPool, document_id: Uuid) -> Result<Option<DocumentMetadata>> {
    let doc = sqlx::query_as::<_, DocumentMetadata>(
        "SELECT * FROM documents WHERE document_id = $1",
    )
    .bind(document_id)
    .fetch_optional(pool)
    .await?;
    Ok(doc)
}

pub async fn update_status(
    pool: &PgPool,
    document_id: Uuid,
    status: ProcessingStatus,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "UPDATE documents
         SET status = $1, error_message = $2, processing_timestamp = NOW()
         WHERE document_id = $3",
    )
    .bind(status.as_str())
    .bind(error)
    .bind(document_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_completed(
    pool: &PgPool,
    document_id: Uuid,
    processed_path: &str,
    extraction_method: &str,
    ocr_confidence: Option<f64>,
) -> Result<()> {
    sqlx::query(
        "UPDATE documents
         SET status = 'completed', error_message = NULL, processing_timestamp = NOW(),
             processed_path = $1, extraction_method = $2, ocr_confidence = $3
         WHERE document_id = $4",
    )
    .bind(processed_path)
    .bind(extraction_method)
    .bind(ocr_confidence)
    .bind(document_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_document(pool: &PgPool, document_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE document_id = $1")
        .bind(document_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_event(pool: &PgPool, event: &AnalyticsEvent) -> Result<()> {
    sqlx::query(
        "INSERT INTO analytics_events (document_id, user_id, action, timestamp, metadata,
                                       processing_time, file_size, simplification_level,
                                       confidence_score, user_feedback)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(&event.document_id)
    .bind(&event.user_id)
    .bind(&event.action)
    .bind(event.timestamp)
    .bind(&event.metadata)
    .bind(event.processing_time)
    .bind(event.file_size)
    .bind(&event.simplification_level)
    .bind(event.confidence_score)
    .bind(&event.user_feedback)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn usage_statistics(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<UsageStats> {
    let stats = sqlx::query_as::<_, UsageStats>(
        "SELECT COUNT(*) AS total_actions,
                COUNT(DISTINCT document_id) AS unique_documents,
                COUNT(DISTINCT user_id) AS unique_users,
                COUNT(*) FILTER (WHERE action = 'document_upload') AS uploads,
                COUNT(*) FILTER (WHERE action = 'document_processing') AS processing_events,
                COUNT(*) FILTER (WHERE action = 'document_view') AS views,
                COUNT(*) FILTER (WHERE action = 'document_deletion') AS deletions,
                AVG(processing_time) AS avg_processing_time,
                AVG(confidence_score) AS avg_confidence_score,
                COUNT(user_feedback) AS feedback_count
         FROM analytics_events
         WHERE timestamp BETWEEN $1 AND $2",
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

pub async fn performance_metrics(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DailyMetrics>> {
    let rows = sqlx::query_as::<_, DailyMetrics>(
        "SELECT date_trunc('day', timestamp)::date AS date,
                COUNT(*) AS daily_actions,
                COUNT(DISTINCT document_id) AS daily_documents,
                COUNT(DISTINCT user_id) AS daily_users,
                AVG(processing_time) AS avg_processing_time,
                AVG(confidence_score) AS avg_confidence_score,
                COUNT(*) FILTER (WHERE processing_time > 30) AS slow_processing_count,
                COUNT(*) FILTER (WHERE confidence_score < 0.7) AS low_confidence_count
         FROM analytics_events
         WHERE timestamp BETWEEN $1 AND $2
         GROUP BY 1
         ORDER BY 1",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn document_statistics(
    pool: &PgPool,
    document_id: Uuid,
) -> Result<Option<DocumentStats>> {
    let stats = sqlx::query_as::<_, DocumentStats>(
        "SELECT document_id,
                COUNT(*) AS total_events,
                COUNT(DISTINCT action) AS unique_actions,
                MIN(timestamp) AS first_event,
                MAX(timestamp) AS last_event,
                COUNT(*) FILTER (WHERE action = 'document_upload') AS uploads,
                COUNT(*) FILTER (WHERE action = 'document_processing') AS processing_events,
                COUNT(*) FILTER (WHERE action = 'document_view') AS views,
                AVG(processing_time) AS avg_processing_time,
                AVG(confidence_score) AS avg_confidence_score,
                COUNT(user_feedback) AS feedback_count
         FROM analytics_events
         WHERE document_id = $1
         GROUP BY document_id",
    )
    .bind(document_id.to_string())
    .fetch_optional(pool)
    .await?;
    Ok(stats)
}

pub async fn document_type_statistics(pool: &PgPool) -> Result<Vec<DocumentTypeStats>> {
    let rows = sqlx::query_as::<_, DocumentTypeStats>(
        "SELECT metadata->>'file_type' AS file_type,
                COUNT(*) AS count,
                AVG(file_size::float8) AS avg_file_size
         FROM analytics_events
         WHERE action = 'document_upload'
           AND metadata->>'file_type' IS NOT NULL
         GROUP BY 1
         ORDER BY count DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn effectiveness_statistics(pool: &PgPool) -> Result<Vec<EffectivenessStats>> {
    let rows = sqlx::query_as::<_, EffectivenessStats>(
        "SELECT simplification_level,
                COUNT(*) AS count,
                AVG(confidence_score) AS avg_confidence,
                AVG(processing_time) AS avg_processing_time,
                COUNT(user_feedback) AS feedback_count
         FROM analytics_events
         WHERE action = 'document_processing'
           AND simplification_level IS NOT NULL
         GROUP BY simplification_level
         ORDER BY count DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
