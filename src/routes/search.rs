use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::{
    error::AppResult,
    models::{ShowSummary, UserId},
    services::show_search,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// Handler for catalog search
pub async fn search(
    State(state): State<AppState>,
    user: UserId,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<ShowSummary>>> {
    tracing::debug!(user_id = %user, query = %params.q, "Catalog search");
    let shows =
        show_search::search_shows(state.catalog.as_ref(), &state.genres, &params.q).await?;
    Ok(Json(shows))
}
