use std::collections::BTreeSet;

use crate::{
    db::UserStore,
    error::{AppError, AppResult},
    models::{EpisodeKey, UserId, WatchMark},
};

/// Checks episode coordinates and collapses duplicates, keeping season/episode order
fn validate_episodes<I>(episodes: I) -> AppResult<Vec<EpisodeKey>>
where
    I: IntoIterator<Item = EpisodeKey>,
{
    let mut unique = BTreeSet::new();
    for key in episodes {
        if key.season < 0 {
            return Err(AppError::InvalidInput(format!(
                "Season number must not be negative, got {}",
                key.season
            )));
        }
        if key.episode < 1 {
            return Err(AppError::InvalidInput(format!(
                "Episode number must be at least 1, got {}",
                key.episode
            )));
        }
        unique.insert(key);
    }
    Ok(unique.into_iter().collect())
}

/// Marks one episode watched. Marking it again has no further effect.
pub async fn mark_episode_watched(
    store: &dyn UserStore,
    user: UserId,
    tmdb_id: i64,
    season: i32,
    episode: i32,
) -> AppResult<()> {
    mark_all_watched(store, user, tmdb_id, &[EpisodeKey::new(season, episode)]).await
}

/// Removes the mark of one episode. Unmarking an unwatched episode is not an error.
pub async fn unmark_episode_watched(
    store: &dyn UserStore,
    user: UserId,
    tmdb_id: i64,
    season: i32,
    episode: i32,
) -> AppResult<()> {
    unmark_all_watched(store, user, tmdb_id, &[EpisodeKey::new(season, episode)]).await
}

/// Marks the given episodes of one season watched
pub async fn mark_season_watched(
    store: &dyn UserStore,
    user: UserId,
    tmdb_id: i64,
    season: i32,
    episodes: &[i32],
) -> AppResult<()> {
    let keys: Vec<EpisodeKey> = episodes
        .iter()
        .map(|&e| EpisodeKey::new(season, e))
        .collect();
    mark_all_watched(store, user, tmdb_id, &keys).await
}

/// Removes the marks of the given episodes of one season
pub async fn unmark_season_watched(
    store: &dyn UserStore,
    user: UserId,
    tmdb_id: i64,
    season: i32,
    episodes: &[i32],
) -> AppResult<()> {
    let keys: Vec<EpisodeKey> = episodes
        .iter()
        .map(|&e| EpisodeKey::new(season, e))
        .collect();
    unmark_all_watched(store, user, tmdb_id, &keys).await
}

/// Marks every listed episode watched in one all-or-nothing batch.
///
/// A store failure is returned as is; callers should re-read progress to reconcile any
/// optimistic state.
pub async fn mark_all_watched(
    store: &dyn UserStore,
    user: UserId,
    tmdb_id: i64,
    episodes: &[EpisodeKey],
) -> AppResult<()> {
    let episodes = validate_episodes(episodes.iter().copied())?;
    if episodes.is_empty() {
        return Ok(());
    }

    let count = episodes.len();
    store.upsert_watch_marks(user, tmdb_id, episodes).await?;

    tracing::info!(user_id = %user, tmdb_id, episodes = count, "Episodes marked watched");
    Ok(())
}

/// Removes the marks of every listed episode in one all-or-nothing batch
pub async fn unmark_all_watched(
    store: &dyn UserStore,
    user: UserId,
    tmdb_id: i64,
    episodes: &[EpisodeKey],
) -> AppResult<()> {
    let episodes = validate_episodes(episodes.iter().copied())?;
    if episodes.is_empty() {
        return Ok(());
    }

    let count = episodes.len();
    store.delete_watch_marks(user, tmdb_id, episodes).await?;

    tracing::info!(user_id = %user, tmdb_id, episodes = count, "Episodes unmarked");
    Ok(())
}

/// Watch marks of one show, ordered by season then episode
pub async fn list_progress(
    store: &dyn UserStore,
    user: UserId,
    tmdb_id: i64,
) -> AppResult<Vec<WatchMark>> {
    let mut marks = store.watch_marks_for_shows(user, vec![tmdb_id]).await?;
    marks.retain(|m| m.tmdb_id == tmdb_id);
    marks.sort_by_key(WatchMark::key);
    Ok(marks)
}
