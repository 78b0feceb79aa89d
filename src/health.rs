use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub services: BTreeMap<&'static str, &'static str>,
}

/// Liveness plus a coarse dependency map: the database must answer a probe
/// query and the blob store root must be reachable.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let database = match sqlx::query("SELECT 1").execute(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::warn!("database health probe failed: {}", e);
            "unhealthy"
        }
    };

    let storage = match tokio::fs::metadata(state.blobs.root()).await {
        Ok(meta) if meta.is_dir() => "healthy",
        _ => "unhealthy",
    };

    let ai_service = if state.config.gemini_api_key.is_empty() {
        "unhealthy"
    } else {
        "healthy"
    };

    let mut services = BTreeMap::new();
    services.insert("api", "healthy");
    services.insert("database", database);
    services.insert("storage", storage);
    services.insert("ai_service", ai_service);

    let status = if services.values().all(|s| *s == "healthy") {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthCheckResponse {
        status,
        timestamp: Utc::now(),
        version: config::VERSION,
        services,
    })
}
