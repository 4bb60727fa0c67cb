//! HTTP surface.
//!
//! | Method | Path              | Purpose                                 |
//! |--------|-------------------|-----------------------------------------|
//! | GET    | `/health`         | reachability of each external service   |
//! | GET    | `/config`         | settings summary                        |
//! | GET    | `/collection`     | record count and collection status      |
//! | DELETE | `/collection`     | delete every record                     |
//! | POST   | `/ingest`         | ingest already-extracted text items     |
//! | POST   | `/upload`         | ingest multipart PDF or text files      |
//! | POST   | `/ask`            | answer a question with sources          |
//! | POST   | `/ask/stream`     | answer as server-sent events            |

mod handlers;
mod sse;

pub use handlers::{
    AskRequest, AskResponse, IngestItem, IngestRequest, IngestResponse, NO_CONTEXT_MESSAGE,
};

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use localrag::RagPipeline;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::settings::Settings;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline, settings: Settings) -> Self {
        Self { pipeline: Arc::new(pipeline), settings: Arc::new(settings) }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("settings", &self.settings).finish_non_exhaustive()
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::config))
        .route("/collection", get(handlers::collection_info).delete(handlers::clear_collection))
        .route("/ingest", post(handlers::ingest))
        .route("/upload", post(handlers::upload))
        .route("/ask", post(handlers::ask))
        .route("/ask/stream", post(sse::ask_stream))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve the router on the configured address until the process is stopped.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.settings.bind_addr;
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("localrag listening on http://{}", addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
