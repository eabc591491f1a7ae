use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::{
    error::AppResult,
    models::{EpisodeKey, UserId, WatchMark},
    services::progress,
};

#[derive(Debug, Deserialize)]
pub struct SeasonEpisodesRequest {
    pub episodes: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeBatchRequest {
    pub episodes: Vec<EpisodeKey>,
}

/// Watch marks of one show
pub async fn list(
    State(state): State<AppState>,
    user: UserId,
    Path(tmdb_id): Path<i64>,
) -> AppResult<Json<Vec<WatchMark>>> {
    let marks = progress::list_progress(state.store.as_ref(), user, tmdb_id).await?;
    Ok(Json(marks))
}

pub async fn mark_episode(
    State(state): State<AppState>,
    user: UserId,
    Path((tmdb_id, season, episode)): Path<(i64, i32, i32)>,
) -> AppResult<StatusCode> {
    progress::mark_episode_watched(state.store.as_ref(), user, tmdb_id, season, episode).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unmark_episode(
    State(state): State<AppState>,
    user: UserId,
    Path((tmdb_id, season, episode)): Path<(i64, i32, i32)>,
) -> AppResult<StatusCode> {
    progress::unmark_episode_watched(state.store.as_ref(), user, tmdb_id, season, episode)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_season(
    State(state): State<AppState>,
    user: UserId,
    Path((tmdb_id, season)): Path<(i64, i32)>,
    Json(request): Json<SeasonEpisodesRequest>,
) -> AppResult<StatusCode> {
    progress::mark_season_watched(
        state.store.as_ref(),
        user,
        tmdb_id,
        season,
        &request.episodes,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unmark_season(
    State(state): State<AppState>,
    user: UserId,
    Path((tmdb_id, season)): Path<(i64, i32)>,
    Json(request): Json<SeasonEpisodesRequest>,
) -> AppResult<StatusCode> {
    progress::unmark_season_watched(
        state.store.as_ref(),
        user,
        tmdb_id,
        season,
        &request.episodes,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all(
    State(state): State<AppState>,
    user: UserId,
    Path(tmdb_id): Path<i64>,
    Json(request): Json<EpisodeBatchRequest>,
) -> AppResult<StatusCode> {
    progress::mark_all_watched(state.store.as_ref(), user, tmdb_id, &request.episodes).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unmark_all(
    State(state): State<AppState>,
    user: UserId,
    Path(tmdb_id): Path<i64>,
    Json(request): Json<EpisodeBatchRequest>,
) -> AppResult<StatusCode> {
    progress::unmark_all_watched(state.store.as_ref(), user, tmdb_id, &request.episodes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
