use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use crate::config::{self, DEFAULT_MAX_CONTENT_BYTES, ServerSettings};
use crate::source::{ContentFetcher, HttpFetcher};
use crate::storage::Database;

pub mod docs;
pub mod error;
pub mod routes;

pub use docs::ApiDoc;
pub use error::{ApiError, MessageResponse};

/// Room left in a request body for the JSON around inline content
const BODY_ENVELOPE_BYTES: usize = 64 * 1024;

/// Largest request body accepted when inline content may be `max_content_bytes`
pub fn request_body_limit(max_content_bytes: usize) -> usize {
    max_content_bytes.saturating_add(BODY_ENVELOPE_BYTES)
}

/// Server state
pub struct AppState {
    pub db: Database,
    pub fetcher: Arc<dyn ContentFetcher>,
    /// Deleting an absent collection answers 404 instead of succeeding
    pub strict_deletes: bool,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(db: Database, fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            db,
            fetcher,
            strict_deletes: false,
            max_body_bytes: request_body_limit(DEFAULT_MAX_CONTENT_BYTES),
        }
    }

    pub fn with_strict_deletes(mut self, strict: bool) -> Self {
        self.strict_deletes = strict;
        self
    }

    pub fn with_max_content_bytes(mut self, max_content_bytes: usize) -> Self {
        self.max_body_bytes = request_body_limit(max_content_bytes);
        self
    }
}

/// Build the application router with access logging
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_body_bytes;

    Router::new()
        .route(
            "/collections",
            get(routes::list_collections).post(routes::create_collection),
        )
        .route(
            "/collections/{name}",
            get(routes::get_collection)
                .put(routes::update_collection)
                .delete(routes::delete_collection),
        )
        .route(
            "/collections/{name}/datapoints",
            get(routes::get_collection_data_points),
        )
        .route(
            "/collections/{name}/tags",
            get(routes::list_tags).post(routes::create_tag),
        )
        .route(
            "/collections/{name}/tags/{tag_id}",
            put(routes::update_tag).delete(routes::delete_tag),
        )
        .route(
            "/collections/{name}/tags/{tag_id}/datapoints",
            get(routes::get_tag_data_points).post(routes::create_data_point),
        )
        .route(
            "/collections/{name}/tags/{tag_id}/datapoints/{id}",
            put(routes::update_data_point).delete(routes::delete_data_point),
        )
        .route("/healthz", get(routes::health))
        .merge(SwaggerUi::new(docs::SWAGGER_PATH).url(docs::OPENAPI_PATH, ApiDoc::openapi()))
        .method_not_allowed_fallback(|| async {
            ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        })
        .fallback(|| async { ApiError::not_found("route not found") })
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(settings: ServerSettings) -> anyhow::Result<()> {
    config::ensure_db_dir(&settings.database)?;
    let db = Database::open(&settings.database)?;
    tracing::info!("Opened database {}", settings.database.display());

    let fetcher = HttpFetcher::new(settings.fetch_timeout, settings.max_content_bytes)?;
    let state = Arc::new(
        AppState::new(db, Arc::new(fetcher))
            .with_strict_deletes(settings.strict_deletes)
            .with_max_content_bytes(settings.max_content_bytes),
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((settings.host.as_str(), settings.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
