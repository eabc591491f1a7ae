use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    models::{EnrichedShow, NewTrackedShow, ShowStatus, TrackedShow, UserId},
};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ShowStatus,
}

fn ensure_known(status: ShowStatus) -> AppResult<()> {
    if status == ShowStatus::Unknown {
        return Err(AppError::InvalidInput("Unrecognized status".to_string()));
    }
    Ok(())
}

/// Lists the user's shows, enriched with catalog data and in display order
pub async fn list(
    State(state): State<AppState>,
    user: UserId,
) -> AppResult<Json<Vec<EnrichedShow>>> {
    let shows = state.store.list_tracked_shows(user).await?;
    let enriched = state.engine.enrich(user, shows, Utc::now()).await;
    Ok(Json(enriched))
}

/// Adds a show to the user's watchlist
pub async fn add(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<NewTrackedShow>,
) -> AppResult<(StatusCode, Json<TrackedShow>)> {
    if request.tmdb_id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "Invalid catalog id {}",
            request.tmdb_id
        )));
    }
    if request.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
    }
    ensure_known(request.status)?;

    let show = state.store.add_tracked_show(user, request).await?;
    tracing::info!(user_id = %user, tmdb_id = show.tmdb_id, status = %show.status, "Show added");
    Ok((StatusCode::CREATED, Json(show)))
}

/// Explicit status change by the user
pub async fn update_status(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> AppResult<Json<TrackedShow>> {
    ensure_known(request.status)?;
    let show = state.store.update_status(user, id, request.status).await?;
    tracing::info!(user_id = %user, show_id = %id, status = %show.status, "Status changed");
    Ok(Json(show))
}

pub async fn remove(
    State(state): State<AppState>,
    user: UserId,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.store.remove_tracked_show(user, id).await?;
    tracing::info!(user_id = %user, show_id = %id, "Show removed");
    Ok(StatusCode::NO_CONTENT)
}
