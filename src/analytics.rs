use axum::extract::{Path, Query, State};
use axum::response::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{
    AnalyticsEvent, DailyMetrics, DocumentStats, DocumentTypeStats, EffectivenessStats, UsageStats,
};
use crate::db::queries;
use crate::error::ApiError;
use crate::state::AppState;

/// Append-only event sink with at-least-once delivery: writes happen on a
/// background task, failures are logged and never fail the request that
/// produced the event. Duplicate events are harmless because every consumer
/// aggregates additively.
#[derive(Clone)]
pub struct AnalyticsSink {
    pool: PgPool,
}

impl AnalyticsSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fire-and-forget record of a single event.
    pub fn record(&self, event: AnalyticsEvent) {
        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = queries::insert_event(&pool, &event).await {
                tracing::warn!("failed to record {} event: {}", event.action, e);
            }
        });
    }

    /// Synchronous variant used where the caller wants an acknowledgment.
    pub async fn record_now(&self, event: &AnalyticsEvent) -> anyhow::Result<()> {
        queries::insert_event(&self.pool, event).await
    }

    pub fn track_document_upload(
        &self,
        document_id: Uuid,
        user_id: Option<Uuid>,
        file_size: i64,
        file_type: &str,
    ) {
        let mut event = AnalyticsEvent::new(document_id.to_string(), "document_upload");
        event.user_id = user_id.map(|id| id.to_string());
        event.metadata = json!({ "file_size": file_size, "file_type": file_type });
        event.file_size = Some(file_size);
        self.record(event);
    }

    pub fn track_document_processing(
        &self,
        document_id: Uuid,
        processing_time: f64,
        simplification_level: &str,
        confidence_score: f64,
    ) {
        let mut event = AnalyticsEvent::new(document_id.to_string(), "document_processing");
        event.metadata = json!({
            "simplification_level": simplification_level,
            "confidence_score": confidence_score,
        });
        event.processing_time = Some(processing_time);
        event.simplification_level = Some(simplification_level.to_string());
        event.confidence_score = Some(confidence_score);
        self.record(event);
    }

    pub fn track_document_view(&self, document_id: Uuid) {
        self.record(AnalyticsEvent::new(document_id.to_string(), "document_view"));
    }

    pub fn track_document_deletion(&self, document_id: Uuid) {
        self.record(AnalyticsEvent::new(
            document_id.to_string(),
            "document_deletion",
        ));
    }

    pub fn track_document_qa(&self, document_id: Uuid, question: &str, confidence: f64) {
        let mut event = AnalyticsEvent::new(document_id.to_string(), "document_qa");
        event.metadata = json!({ "question": question });
        event.confidence_score = Some(confidence);
        self.record(event);
    }

    pub fn track_user_event(&self, user_id: Uuid, action: &str, email: &str) {
        let mut event = AnalyticsEvent::new("system", action);
        event.user_id = Some(user_id.to_string());
        event.metadata = json!({ "email": email });
        self.record(event);
    }
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl PeriodQuery {
    fn resolve(&self, default_days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.end_date.unwrap_or_else(Utc::now);
        let start = self
            .start_date
            .unwrap_or_else(|| end - Duration::days(default_days));
        (start, end)
    }
}

#[derive(Debug, Serialize)]
pub struct Period {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub period: Period,
    #[serde(flatten)]
    pub stats: UsageStats,
}

#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub period: Period,
    pub daily_metrics: Vec<DailyMetrics>,
}

#[derive(Debug, Serialize)]
pub struct DocumentTypesResponse {
    pub document_types: Vec<DocumentTypeStats>,
}

#[derive(Debug, Serialize)]
pub struct EffectivenessResponse {
    pub simplification_levels: Vec<EffectivenessStats>,
}

/// Body for `POST /analytics/track`: an externally produced event, e.g. the
/// presenter's feedback action.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub document_id: String,
    pub action: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub processing_time: Option<f64>,
    pub confidence_score: Option<f64>,
    pub user_feedback: Option<String>,
}

pub async fn usage_statistics(
    State(state): State<AppState>,
    Query(period): Query<PeriodQuery>,
) -> Result<Json<UsageResponse>, ApiError> {
    let (start, end) = period.resolve(30);
    let stats = queries::usage_statistics(&state.db_pool, start, end)
        .await
        .map_err(ApiError::storage)?;
    Ok(Json(UsageResponse {
        period: Period {
            start_date: start,
            end_date: end,
        },
        stats,
    }))
}

pub async fn performance_metrics(
    State(state): State<AppState>,
    Query(period): Query<PeriodQuery>,
) -> Result<Json<PerformanceResponse>, ApiError> {
    let (start, end) = period.resolve(7);
    let daily_metrics = queries::performance_metrics(&state.db_pool, start, end)
        .await
        .map_err(ApiError::storage)?;
    Ok(Json(PerformanceResponse {
        period: Period {
            start_date: start,
            end_date: end,
        },
        daily_metrics,
    }))
}

pub async fn document_analytics(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentStats>, ApiError> {
    let stats = queries::document_statistics(&state.db_pool, document_id)
        .await
        .map_err(ApiError::storage)?
        .ok_or_else(|| ApiError::NotFound("no analytics recorded for this document".into()))?;
    Ok(Json(stats))
}

pub async fn document_type_analytics(
    State(state): State<AppState>,
) -> Result<Json<DocumentTypesResponse>, ApiError> {
    let document_types = queries::document_type_statistics(&state.db_pool)
        .await
        .map_err(ApiError::storage)?;
    Ok(Json(DocumentTypesResponse { document_types }))
}

pub async fn simplification_effectiveness(
    State(state): State<AppState>,
) -> Result<Json<EffectivenessResponse>, ApiError> {
    let simplification_levels = queries::effectiveness_statistics(&state.db_pool)
        .await
        .map_err(ApiError::storage)?;
    Ok(Json(EffectivenessResponse {
        simplification_levels,
    }))
}

pub async fn track_event(
    State(state): State<AppState>,
    Json(request): Json<TrackRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if request.action.trim().is_empty() {
        return Err(ApiError::Validation("action must not be empty".into()));
    }
    if request.document_id.trim().is_empty() {
        return Err(ApiError::Validation("document_id must not be empty".into()));
    }

    let mut event = AnalyticsEvent::new(request.document_id, request.action);
    event.metadata = request.metadata;
    event.processing_time = request.processing_time;
    event.confidence_score = request.confidence_score;
    event.user_feedback = request.user_feedback;

    state
        .analytics
        .record_now(&event)
        .await
        .map_err(ApiError::storage)?;

    Ok(Json(json!({ "status": "recorded" })))
}
