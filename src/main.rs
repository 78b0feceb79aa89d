use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use plainlex::config::Config;
use plainlex::ingest::validation::MAX_FILE_SIZE;
use plainlex::rate_limit::{self, RateScope};
use plainlex::state::AppState;
use plainlex::storage::BlobStore;
use plainlex::{analytics, auth, db, documents, health, ingest};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("plainlex=info,tower_http=info")),
        )
        .init();

    let bind_address = config.bind_address;
    let pool = db::create_pool(&config.database_url).await?;
    let blobs = BlobStore::new(&config.storage_root).await?;
    let state = AppState::new(config, pool, blobs)?;

    let app = router(state);

    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    // Upload and processing draw from their own, tighter per-IP budgets.
    let upload_routes = Router::new()
        .route("/documents/upload", post(ingest::handle_document_upload))
        .layer(middleware::from_fn_with_state(
            (state.clone(), RateScope::Upload),
            rate_limit::enforce,
        ));

    let processing_routes = Router::new()
        .route(
            "/documents/{id}/process",
            post(documents::process_document),
        )
        .route(
            "/documents/batch/process",
            post(documents::batch_process_documents),
        )
        .route("/documents/{id}/qa", post(documents::document_qa))
        .layer(middleware::from_fn_with_state(
            (state.clone(), RateScope::Processing),
            rate_limit::enforce,
        ));

    let general_routes = Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/documents/{id}",
            get(documents::get_simplified_document).delete(documents::delete_document),
        )
        .route(
            "/documents/{id}/metadata",
            get(documents::get_document_metadata),
        )
        .route("/analytics/usage", get(analytics::usage_statistics))
        .route("/analytics/performance", get(analytics::performance_metrics))
        .route("/analytics/documents/{id}", get(analytics::document_analytics))
        .route(
            "/analytics/document-types",
            get(analytics::document_type_analytics),
        )
        .route(
            "/analytics/simplification-effectiveness",
            get(analytics::simplification_effectiveness),
        )
        .route("/analytics/track", post(analytics::track_event))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me));

    let api = upload_routes
        .merge(processing_routes)
        .merge(general_routes)
        .layer(middleware::from_fn_with_state(
            (state.clone(), RateScope::General),
            rate_limit::enforce,
        ));

    Router::new()
        .nest("/api/v1", api)
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        // Leave headroom above the validator's ceiling so oversized uploads
        // get a proper envelope instead of a bare 413 from the body limit.
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 1024 * 1024))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
