use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    db::UserStore,
    models::{
        max_watched_season, EnrichedShow, EpisodeKey, SeasonMeta, ShowStatus, TrackedShow,
        UserId, WatchMark,
    },
    services::{
        catalog::ShowCatalog,
        classification::{auto_transition, compute_tags, enrich_show, sort_for_display},
        status_writer::{StatusCommandQueue, StatusUpdate},
    },
};

/// Shows whose watch progress has already been backfilled in this process
#[derive(Default)]
pub struct BackfillLedger {
    done: Mutex<HashSet<(UserId, i64)>>,
}

impl BackfillLedger {
    /// Records the show as backfilled; false if it already was
    pub async fn claim(&self, user: UserId, tmdb_id: i64) -> bool {
        self.done.lock().await.insert((user, tmdb_id))
    }
}

/// Builds the display list of a user's watchlist.
///
/// Season snapshots come from the catalog, watch marks from the store. Automatic
/// status changes are applied to the returned list and queued as [`StatusUpdate`]s.
pub struct EnrichmentEngine {
    catalog: Arc<dyn ShowCatalog>,
    store: Arc<dyn UserStore>,
    commands: StatusCommandQueue,
    backfilled: BackfillLedger,
}

impl EnrichmentEngine {
    pub fn new(
        catalog: Arc<dyn ShowCatalog>,
        store: Arc<dyn UserStore>,
        commands: StatusCommandQueue,
    ) -> Self {
        Self {
            catalog,
            store,
            commands,
            backfilled: BackfillLedger::default(),
        }
    }

    /// Enriches and orders `shows` as of `now`.
    ///
    /// Never fails: missing catalog data leaves a show untagged and missing watch data
    /// disables backfill and new-season suppression.
    pub async fn enrich(
        &self,
        user: UserId,
        shows: Vec<TrackedShow>,
        now: DateTime<Utc>,
    ) -> Vec<EnrichedShow> {
        if shows.is_empty() {
            return Vec::new();
        }

        let tmdb_ids: Vec<i64> = shows.iter().map(|s| s.tmdb_id).collect();

        let (metas, marks) = tokio::join!(
            self.fetch_season_metas(&tmdb_ids),
            self.store.watch_marks_for_shows(user, tmdb_ids.clone())
        );

        let marks_by_show = match marks {
            Ok(marks) => Some(group_by_show(marks)),
            Err(e) => {
                tracing::warn!(
                    user_id = %user,
                    error = %e,
                    "Watch progress unavailable, enriching without it"
                );
                None
            }
        };

        let mut enriched = Vec::with_capacity(shows.len());
        let mut transitioned = Vec::new();
        let mut backfill = Vec::new();

        for show in shows {
            let Some(meta) = metas.get(&show.tmdb_id) else {
                enriched.push(EnrichedShow::bare(show));
                continue;
            };

            let show_marks = marks_by_show
                .as_ref()
                .map(|m| m.get(&show.tmdb_id).map(Vec::as_slice).unwrap_or_default());

            let max_season = if show.status == ShowStatus::Completed
                && show_marks.is_some_and(|m| m.is_empty())
            {
                // Tag against the marks the backfill is about to write
                let episodes = meta.aired_episodes();
                let max_season = episodes.iter().map(|k| k.season).max();
                backfill.push((show.tmdb_id, episodes));
                max_season
            } else {
                show_marks.and_then(|m| max_watched_season(m))
            };
            let mut item = enrich_show(show, compute_tags(meta, max_season, now));

            if let Some(status) = auto_transition(&item) {
                tracing::info!(
                    user_id = %user,
                    tmdb_id = item.show.tmdb_id,
                    from = %item.show.status,
                    to = %status,
                    "Automatic status change"
                );
                item.show.status = status;
                transitioned.push(item.show.id);
            }

            enriched.push(item);
        }

        self.commands.push(StatusUpdate {
            user,
            show_ids: transitioned,
            from: ShowStatus::Completed,
            status: ShowStatus::Watching,
        });

        for (tmdb_id, episodes) in backfill {
            self.backfill_progress(user, tmdb_id, episodes).await;
        }

        sort_for_display(&mut enriched);

        tracing::debug!(
            user_id = %user,
            shows = enriched.len(),
            with_metadata = metas.len(),
            "Watchlist enriched"
        );

        enriched
    }

    /// Fetches every show's season snapshot concurrently.
    ///
    /// Failures are isolated: a show whose fetch errors, is unknown to the catalog or
    /// whose task panics is simply absent from the result.
    async fn fetch_season_metas(&self, tmdb_ids: &[i64]) -> HashMap<i64, SeasonMeta> {
        let mut tasks = Vec::with_capacity(tmdb_ids.len());

        for &tmdb_id in tmdb_ids {
            let catalog = Arc::clone(&self.catalog);
            let task = tokio::spawn(async move { catalog.get_season_meta(tmdb_id).await });
            tasks.push((tmdb_id, task));
        }

        let mut metas = HashMap::with_capacity(tasks.len());
        let mut failures = 0usize;

        for (tmdb_id, task) in tasks {
            match task.await {
                Ok(Ok(Some(meta))) => {
                    metas.insert(tmdb_id, meta);
                }
                Ok(Ok(None)) => {
                    tracing::debug!(tmdb_id, "No season metadata for show");
                }
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(tmdb_id, error = %e, "Season metadata fetch failed");
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(tmdb_id, error = %e, "Season metadata task failed");
                }
            }
        }

        if failures > 0 {
            tracing::warn!(
                success_count = metas.len(),
                error_count = failures,
                catalog = self.catalog.name(),
                "Partial season metadata failure"
            );
        }

        metas
    }

    /// Writes marks for every aired episode of a completed show that has none, once
    /// per show and process
    async fn backfill_progress(&self, user: UserId, tmdb_id: i64, episodes: Vec<EpisodeKey>) {
        if episodes.is_empty() || !self.backfilled.claim(user, tmdb_id).await {
            return;
        }

        let count = episodes.len();
        match self.store.upsert_watch_marks(user, tmdb_id, episodes).await {
            Ok(()) => tracing::info!(
                user_id = %user,
                tmdb_id,
                episodes = count,
                "Backfilled watch progress for completed show"
            ),
            Err(e) => tracing::warn!(
                user_id = %user,
                tmdb_id,
                error = %e,
                "Watch progress backfill failed"
            ),
        }
    }
}

fn group_by_show(marks: Vec<WatchMark>) -> HashMap<i64, Vec<WatchMark>> {
    let mut grouped: HashMap<i64, Vec<WatchMark>> = HashMap::new();
    for mark in marks {
        grouped.entry(mark.tmdb_id).or_default().push(mark);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::store::MockUserStore,
        error::AppError,
        models::{EpisodeRef, NewSeasonTag, SeasonSummary},
        services::catalog::MockShowCatalog,
    };
    use chrono::{Duration, NaiveDate, TimeZone};
    use mockall::predicate::eq;
    use tokio::sync::mpsc::UnboundedReceiver;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn day(offset: i64) -> Option<NaiveDate> {
        Some((now() + Duration::days(offset)).date_naive())
    }

    fn user() -> UserId {
        UserId(Uuid::nil())
    }

    fn tracked(tmdb_id: i64, status: ShowStatus) -> TrackedShow {
        TrackedShow {
            id: Uuid::new_v4(),
            tmdb_id,
            title: format!("Show {}", tmdb_id),
            poster_url: None,
            backdrop_url: None,
            status,
            created_at: now() - Duration::days(60),
        }
    }

    fn episode(season: i32, episode: i32, air_date: Option<NaiveDate>) -> Option<EpisodeRef> {
        Some(EpisodeRef {
            season_number: season,
            episode_number: episode,
            air_date,
        })
    }

    fn mark(tmdb_id: i64, season: i32, episode: i32) -> WatchMark {
        WatchMark {
            tmdb_id,
            season_number: season,
            episode_number: episode,
            watched_at: now(),
        }
    }

    /// Returning season airing: last s2e10 ten days ago, s2e11 in five days
    fn airing_meta() -> SeasonMeta {
        SeasonMeta {
            last_episode: episode(2, 10, day(-10)),
            next_episode: episode(2, 11, day(5)),
            number_of_seasons: 2,
            latest_season_premiere_date: day(-70),
            seasons: vec![
                SeasonSummary { season_number: 1, episode_count: 8, air_date: day(-400) },
                SeasonSummary { season_number: 2, episode_count: 12, air_date: day(-70) },
            ],
        }
    }

    /// Third season premiered twenty days ago
    fn new_season_meta() -> SeasonMeta {
        SeasonMeta {
            last_episode: episode(3, 3, day(-6)),
            next_episode: None,
            number_of_seasons: 3,
            latest_season_premiere_date: day(-20),
            seasons: Vec::new(),
        }
    }

    fn catalog_with(metas: HashMap<i64, SeasonMeta>) -> MockShowCatalog {
        let mut catalog = MockShowCatalog::new();
        catalog
            .expect_get_season_meta()
            .returning(move |id| Ok(metas.get(&id).cloned()));
        catalog.expect_name().return_const("mock");
        catalog
    }

    fn store_with_marks(marks: Vec<WatchMark>) -> MockUserStore {
        let mut store = MockUserStore::new();
        store
            .expect_watch_marks_for_shows()
            .returning(move |_, _| Ok(marks.clone()));
        store
    }

    fn engine(
        catalog: MockShowCatalog,
        store: MockUserStore,
    ) -> (EnrichmentEngine, UnboundedReceiver<StatusUpdate>) {
        let (queue, rx) = StatusCommandQueue::channel();
        (
            EnrichmentEngine::new(Arc::new(catalog), Arc::new(store), queue),
            rx,
        )
    }

    #[tokio::test]
    async fn test_empty_list_makes_no_calls() {
        // Mocks without expectations panic if called
        let (engine, mut rx) = engine(MockShowCatalog::new(), MockUserStore::new());

        let result = engine.enrich(user(), Vec::new(), now()).await;
        assert!(result.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_completed_show_with_new_episodes_moves_to_watching() {
        let show = tracked(100, ShowStatus::Completed);
        let show_id = show.id;

        let (engine, mut rx) = engine(
            catalog_with(HashMap::from([(100, airing_meta())])),
            store_with_marks(vec![mark(100, 2, 10)]),
        );

        let result = engine.enrich(user(), vec![show], now()).await;

        assert_eq!(result.len(), 1);
        assert!(result[0].has_upcoming_episodes_in_current_season);
        assert_eq!(result[0].show.status, ShowStatus::Watching);
        assert_eq!(result[0].next_episode_air_date, day(5));

        let update = rx.try_recv().unwrap();
        assert_eq!(update.show_ids, vec![show_id]);
        assert_eq!(update.from, ShowStatus::Completed);
        assert_eq!(update.status, ShowStatus::Watching);
        assert_eq!(update.user, user());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_command_without_transition() {
        let (engine, mut rx) = engine(
            catalog_with(HashMap::from([(100, airing_meta())])),
            store_with_marks(vec![mark(100, 2, 10)]),
        );

        let result = engine
            .enrich(user(), vec![tracked(100, ShowStatus::OnHold)], now())
            .await;

        assert_eq!(result[0].show.status, ShowStatus::OnHold);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_season_out_depends_on_watched_season() {
        let (engine, _rx) = engine(
            catalog_with(HashMap::from([(200, new_season_meta()), (201, new_season_meta())])),
            store_with_marks(vec![mark(200, 2, 8), mark(201, 2, 8), mark(201, 3, 1)]),
        );

        let result = engine
            .enrich(
                user(),
                vec![
                    tracked(200, ShowStatus::Watching),
                    tracked(201, ShowStatus::Watching),
                ],
                now(),
            )
            .await;

        let tag = |tmdb_id| {
            result
                .iter()
                .find(|s| s.show.tmdb_id == tmdb_id)
                .unwrap()
                .new_season_tag
        };
        assert_eq!(tag(200), Some(NewSeasonTag::Out));
        assert_eq!(tag(201), None);
    }

    #[tokio::test]
    async fn test_distant_new_season_has_no_tag() {
        let meta = SeasonMeta {
            last_episode: episode(3, 10, day(-300)),
            next_episode: episode(4, 1, day(400)),
            number_of_seasons: 4,
            latest_season_premiere_date: day(400),
            seasons: Vec::new(),
        };
        let (engine, _rx) = engine(
            catalog_with(HashMap::from([(300, meta)])),
            store_with_marks(vec![mark(300, 3, 10)]),
        );

        let result = engine
            .enrich(user(), vec![tracked(300, ShowStatus::Watching)], now())
            .await;
        assert_eq!(result[0].new_season_tag, None);
    }

    #[tokio::test]
    async fn test_metadata_failure_is_isolated() {
        let mut catalog = MockShowCatalog::new();
        catalog.expect_get_season_meta().returning(|id| match id {
            1 => Ok(Some(airing_meta())),
            _ => Err(AppError::ExternalApi("timeout".to_string())),
        });
        catalog.expect_name().return_const("mock");

        let (engine, mut rx) = engine(catalog, store_with_marks(vec![mark(2, 1, 1)]));

        let failing = tracked(2, ShowStatus::Completed);
        let failing_id = failing.id;
        let result = engine
            .enrich(user(), vec![failing, tracked(1, ShowStatus::Watching)], now())
            .await;

        assert_eq!(result.len(), 2);
        let degraded = result.iter().find(|s| s.show.id == failing_id).unwrap();
        assert_eq!(degraded.show.status, ShowStatus::Completed);
        assert_eq!(degraded.new_season_tag, None);
        assert!(!degraded.has_upcoming_episodes_in_current_season);

        let healthy = result.iter().find(|s| s.show.tmdb_id == 1).unwrap();
        assert!(healthy.has_upcoming_episodes_in_current_season);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_watch_progress_failure_degrades() {
        let mut store = MockUserStore::new();
        store
            .expect_watch_marks_for_shows()
            .returning(|_, _| Err(AppError::Internal("pool timed out".to_string())));
        // No upsert expectation: backfill must not run

        let (engine, _rx) = engine(
            catalog_with(HashMap::from([(200, new_season_meta())])),
            store,
        );

        let result = engine
            .enrich(user(), vec![tracked(200, ShowStatus::Completed)], now())
            .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].new_season_tag, Some(NewSeasonTag::Out));
    }

    #[tokio::test]
    async fn test_completed_show_without_marks_is_backfilled_once() {
        let mut store = store_with_marks(Vec::new());
        let mut expected: Vec<EpisodeKey> = (1..=8).map(|e| EpisodeKey::new(1, e)).collect();
        expected.extend((1..=10).map(|e| EpisodeKey::new(2, e)));
        store
            .expect_upsert_watch_marks()
            .with(eq(user()), eq(100), eq(expected))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (engine, _rx) = engine(catalog_with(HashMap::from([(100, airing_meta())])), store);

        for _ in 0..2 {
            engine
                .enrich(user(), vec![tracked(100, ShowStatus::Completed)], now())
                .await;
        }
    }

    #[tokio::test]
    async fn test_backfilled_show_renders_the_same_tags_twice() {
        let stored: Arc<std::sync::Mutex<Vec<WatchMark>>> = Arc::default();

        let mut store = MockUserStore::new();
        let reader = Arc::clone(&stored);
        store
            .expect_watch_marks_for_shows()
            .returning(move |_, _| Ok(reader.lock().unwrap().clone()));
        let writer = Arc::clone(&stored);
        store
            .expect_upsert_watch_marks()
            .times(1)
            .returning(move |_, tmdb_id, episodes| {
                let mut marks = writer.lock().unwrap();
                marks.extend(episodes.iter().map(|k| mark(tmdb_id, k.season, k.episode)));
                Ok(())
            });

        let meta = SeasonMeta {
            last_episode: episode(3, 4, day(-3)),
            number_of_seasons: 3,
            latest_season_premiere_date: day(-20),
            seasons: vec![
                SeasonSummary { season_number: 1, episode_count: 6, air_date: day(-800) },
                SeasonSummary { season_number: 2, episode_count: 6, air_date: day(-400) },
                SeasonSummary { season_number: 3, episode_count: 8, air_date: day(-20) },
            ],
            ..Default::default()
        };
        let (engine, _rx) = engine(catalog_with(HashMap::from([(400, meta)])), store);
        let show = tracked(400, ShowStatus::Completed);

        let first = engine.enrich(user(), vec![show.clone()], now()).await;
        let second = engine.enrich(user(), vec![show], now()).await;

        assert_eq!(first[0].new_season_tag, None);
        assert_eq!(second[0].new_season_tag, first[0].new_season_tag);
        assert_eq!(stored.lock().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_output_is_ordered_for_display() {
        let dropped = tracked(10, ShowStatus::Dropped);
        let undated = tracked(11, ShowStatus::Watching);
        let dated = tracked(12, ShowStatus::Watching);
        let planned = tracked(13, ShowStatus::PlanToWatch);
        let expected = vec![dated.id, undated.id, planned.id, dropped.id];

        let recent = SeasonMeta {
            last_episode: episode(1, 4, day(-1)),
            number_of_seasons: 1,
            ..Default::default()
        };
        let (engine, _rx) = engine(
            catalog_with(HashMap::from([(12, recent)])),
            store_with_marks(Vec::new()),
        );

        let result = engine
            .enrich(user(), vec![dropped, undated, dated, planned], now())
            .await;
        let ids: Vec<Uuid> = result.iter().map(|s| s.show.id).collect();
        assert_eq!(ids, expected);
    }
}
