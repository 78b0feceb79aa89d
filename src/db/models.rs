use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{DocumentType, ProcessingStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row per uploaded document. `status` and `file_type` are stored as
/// text; use the typed accessors when branching on them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentMetadata {
    pub document_id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub mime_type: Option<String>,
    pub file_size: i64,
    pub upload_timestamp: DateTime<Utc>,
    pub processing_timestamp: Option<DateTime<Utc>>,
    pub status: String,
    pub user_id: Option<Uuid>,
    pub extraction_method: Option<String>,
    pub ocr_confidence: Option<f64>,
    pub language_detected: Option<String>,
    pub storage_path: String,
    pub processed_path: Option<String>,
    pub error_message: Option<String>,
}

impl DocumentMetadata {
    pub fn document_type(&self) -> Option<DocumentType> {
        DocumentType::parse(&self.file_type)
    }

    pub fn processing_status(&self) -> Option<ProcessingStatus> {
        ProcessingStatus::parse(&self.status)
    }
}

/// A single append-only analytics record. Duplicates are tolerated; all
/// aggregation over these rows is additive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub document_id: String,
    pub user_id: Option<String>,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub processing_time: Option<f64>,
    pub file_size: Option<i64>,
    pub simplification_level: Option<String>,
    pub confidence_score: Option<f64>,
    pub user_feedback: Option<String>,
}

impl AnalyticsEvent {
    pub fn new(document_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            user_id: None,
            action: action.into(),
            timestamp: Utc::now(),
            metadata: serde_json::json!({}),
            processing_time: None,
            file_size: None,
            simplification_level: None,
            confidence_score: None,
            user_feedback: None,
        }
    }
}

// Aggregate rows returned by the analytics queries. Averages are nullable
// because a window can contain no matching events.

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UsageStats {
    pub total_actions: i64,
    pub unique_documents: i64,
    pub unique_users: i64,
    pub uploads: i64,
    pub processing_events: i64,
    pub views: i64,
    pub deletions: i64,
    pub avg_processing_time: Option<f64>,
    pub avg_confidence_score: Option<f64>,
    pub feedback_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyMetrics {
    pub date: chrono::NaiveDate,
    pub daily_actions: i64,
    pub daily_documents: i64,
    pub daily_users: i64,
    pub avg_processing_time: Option<f64>,
    pub avg_confidence_score: Option<f64>,
    pub slow_processing_count: i64,
    pub low_confidence_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DocumentStats {
    pub document_id: String,
    pub total_events: i64,
    pub unique_actions: i64,
    pub first_event: DateTime<Utc>,
    pub last_event: DateTime<Utc>,
    pub uploads: i64,
    pub processing_events: i64,
    pub views: i64,
    pub avg_processing_time: Option<f64>,
    pub avg_confidence_score: Option<f64>,
    pub feedback_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DocumentTypeStats {
    pub file_type: Option<String>,
    pub count: i64,
    pub avg_file_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EffectivenessStats {
    pub simplification_level: String,
    pub count: i64,
    pub avg_confidence: Option<f64>,
    pub avg_processing_time: Option<f64>,
    pub feedback_count: i64,
}
