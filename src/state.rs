use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::analytics::AnalyticsSink;
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::processing::ExtractionPipeline;
use crate::rate_limit::RateLimiter;
use crate::simplifier::Simplifier;
use crate::storage::BlobStore;

/// Shared application state, created once at startup and cloned into every
/// handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub blobs: BlobStore,
    pub pipeline: Arc<ExtractionPipeline>,
    pub simplifier: Arc<Simplifier>,
    pub analytics: AnalyticsSink,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db_pool: PgPool, blobs: BlobStore) -> Result<Self> {
        let gemini = Arc::new(GeminiClient::new(&config)?);
        let analytics = AnalyticsSink::new(db_pool.clone());
        Ok(Self {
            db_pool,
            config: Arc::new(config),
            blobs,
            pipeline: Arc::new(ExtractionPipeline::new(gemini.clone())),
            simplifier: Arc::new(Simplifier::new(gemini)),
            analytics,
            rate_limiter: Arc::new(RateLimiter::new()),
        })
    }
}
