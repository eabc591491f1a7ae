use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    db::UserStore,
    middleware::require_user,
    services::{EnrichmentEngine, GenreTable, ShowCatalog},
};

pub mod progress;
pub mod search;
pub mod shows;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub catalog: Arc<dyn ShowCatalog>,
    pub engine: Arc<EnrichmentEngine>,
    pub genres: Arc<GenreTable>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state))
}

/// API routes under /api/v1, all requiring an authenticated user
fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/shows", get(shows::list).post(shows::add))
        .route("/shows/:id", patch(shows::update_status).delete(shows::remove))
        .route("/search", get(search::search))
        .route("/progress/:tmdb_id", get(progress::list))
        .route(
            "/progress/:tmdb_id/episodes/:season/:episode",
            post(progress::mark_episode).delete(progress::unmark_episode),
        )
        .route(
            "/progress/:tmdb_id/seasons/:season",
            post(progress::mark_season).delete(progress::unmark_season),
        )
        .route(
            "/progress/:tmdb_id/all",
            post(progress::mark_all).delete(progress::unmark_all),
        )
        .route_layer(middleware::from_fn(require_user))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
