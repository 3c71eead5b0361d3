//! JSON HTTP API over the askstore pipeline.
//!
//! # Endpoints
//!
//! | Method   | Path                        | Description |
//! |----------|-----------------------------|-------------|
//! | `POST`   | `/api/chat/query`           | Retrieve ranked fragments for a question |
//! | `POST`   | `/api/chat/generate`        | Generate an answer from supplied fragments and history |
//! | `GET`    | `/api/documents`            | List one page of store documents |
//! | `POST`   | `/api/documents/upload`     | Upload a file (multipart, max 100 MB) |
//! | `DELETE` | `/api/documents/{*name}`    | Delete a document and its chunks |
//! | `GET`    | `/api/operations/{*name}`   | Status of an upload operation |
//! | `GET`    | `/api/config`               | Store name and whether an API key is set |
//! | `GET`    | `/health`                   | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "success": false, "error": { "code": "invalid_input", "message": "Query text is required" } }
//! ```
//!
//! Status codes follow [`AppError::http_status`](askstore_core::AppError::http_status).

pub mod error;
pub mod routes;


use askstore_core::config::PublicConfig;
use askstore_core::AppConfig;
use askstore_knowledge::{DocumentAdmin, FileSearchStore, Pipeline};
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Shared state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    admin: Arc<dyn DocumentAdmin>,
    public_config: Arc<PublicConfig>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<Pipeline>,
        admin: Arc<dyn DocumentAdmin>,
        public_config: PublicConfig,
    ) -> Self {
        Self {
            pipeline,
            admin,
            public_config: Arc::new(public_config),
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/config", get(routes::get_config))
        .route("/api/chat/query", post(routes::chat_query))
        .route("/api/chat/generate", post(routes::chat_generate))
        .route("/api/documents", get(routes::list_documents))
        .route(
            "/api/documents/upload",
            post(routes::upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/documents/{*name}", delete(routes::delete_document))
        .route("/api/operations/{*name}", get(routes::get_operation))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on `config.server.bind` and run until Ctrl-C.
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    let store = Arc::new(FileSearchStore::from_config(config)?);
    let pipeline = Pipeline::from_config(config, store.clone())?;
    let state = AppState::new(Arc::new(pipeline), store, config.public_view());

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!("askstore server listening on http://{}", config.server.bind);

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
    tracing::info!("Shutdown requested");
}
