//! In-memory collaborators for driving the router without Postgres, Redis or TMDB

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc::UnboundedReceiver, Mutex};
use uuid::Uuid;

use showtrack_api::{
    db::UserStore,
    error::{AppError, AppResult},
    middleware::USER_ID_HEADER,
    models::{
        EpisodeKey, NewTrackedShow, SeasonMeta, ShowStatus, ShowSummary, TrackedShow, UserId,
        WatchMark,
    },
    routes::{create_router, AppState},
    services::{EnrichmentEngine, GenreTable, ShowCatalog, StatusCommandQueue, StatusUpdate},
};

#[derive(Default)]
pub struct MemoryStore {
    shows: Mutex<Vec<(UserId, TrackedShow)>>,
    marks: Mutex<BTreeMap<(UserId, i64, EpisodeKey), DateTime<Utc>>>,
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_tracked_shows(&self, user: UserId) -> AppResult<Vec<TrackedShow>> {
        let shows = self.shows.lock().await;
        Ok(shows
            .iter()
            .filter(|(owner, _)| *owner == user)
            .map(|(_, show)| show.clone())
            .collect())
    }

    async fn add_tracked_show(
        &self,
        user: UserId,
        show: NewTrackedShow,
    ) -> AppResult<TrackedShow> {
        let mut shows = self.shows.lock().await;
        if shows
            .iter()
            .any(|(owner, s)| *owner == user && s.tmdb_id == show.tmdb_id)
        {
            return Err(AppError::Conflict("Show already tracked".to_string()));
        }

        let tracked = TrackedShow {
            id: Uuid::new_v4(),
            tmdb_id: show.tmdb_id,
            title: show.title,
            poster_url: show.poster_url,
            backdrop_url: show.backdrop_url,
            status: show.status,
            created_at: Utc::now(),
        };
        shows.push((user, tracked.clone()));
        Ok(tracked)
    }

    async fn update_status(
        &self,
        user: UserId,
        show_id: Uuid,
        status: ShowStatus,
    ) -> AppResult<TrackedShow> {
        let mut shows = self.shows.lock().await;
        let (_, show) = shows
            .iter_mut()
            .find(|(owner, s)| *owner == user && s.id == show_id)
            .ok_or_else(|| AppError::NotFound(format!("Show {} not found", show_id)))?;
        show.status = status;
        Ok(show.clone())
    }

    async fn update_status_batch(
        &self,
        user: UserId,
        show_ids: Vec<Uuid>,
        from: ShowStatus,
        to: ShowStatus,
    ) -> AppResult<u64> {
        let mut shows = self.shows.lock().await;
        let mut updated = 0;
        for (_, show) in shows.iter_mut().filter(|(owner, s)| {
            *owner == user && s.status == from && show_ids.contains(&s.id)
        }) {
            show.status = to;
            updated += 1;
        }
        Ok(updated)
    }

    async fn remove_tracked_show(&self, user: UserId, show_id: Uuid) -> AppResult<()> {
        let mut shows = self.shows.lock().await;
        let index = shows
            .iter()
            .position(|(owner, s)| *owner == user && s.id == show_id)
            .ok_or_else(|| AppError::NotFound(format!("Show {} not found", show_id)))?;
        let (_, removed) = shows.remove(index);

        self.marks
            .lock()
            .await
            .retain(|(owner, tmdb_id, _), _| !(*owner == user && *tmdb_id == removed.tmdb_id));
        Ok(())
    }

    async fn watch_marks_for_shows(
        &self,
        user: UserId,
        tmdb_ids: Vec<i64>,
    ) -> AppResult<Vec<WatchMark>> {
        let marks = self.marks.lock().await;
        Ok(marks
            .iter()
            .filter(|((owner, tmdb_id, _), _)| *owner == user && tmdb_ids.contains(tmdb_id))
            .map(|((_, tmdb_id, key), watched_at)| WatchMark {
                tmdb_id: *tmdb_id,
                season_number: key.season,
                episode_number: key.episode,
                watched_at: *watched_at,
            })
            .collect())
    }

    async fn upsert_watch_marks(
        &self,
        user: UserId,
        tmdb_id: i64,
        episodes: Vec<EpisodeKey>,
    ) -> AppResult<()> {
        let mut marks = self.marks.lock().await;
        let now = Utc::now();
        for key in episodes {
            marks.entry((user, tmdb_id, key)).or_insert(now);
        }
        Ok(())
    }

    async fn delete_watch_marks(
        &self,
        user: UserId,
        tmdb_id: i64,
        episodes: Vec<EpisodeKey>,
    ) -> AppResult<()> {
        let mut marks = self.marks.lock().await;
        for key in episodes {
            marks.remove(&(user, tmdb_id, key));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FixtureCatalog {
    pub shows: Vec<ShowSummary>,
    pub metas: HashMap<i64, SeasonMeta>,
    pub genres: HashMap<i64, String>,
}

#[async_trait]
impl ShowCatalog for FixtureCatalog {
    async fn search_shows(&self, query: &str) -> AppResult<Vec<ShowSummary>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }
        Ok(self
            .shows
            .iter()
            .filter(|s| s.title.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn get_season_meta(&self, tmdb_id: i64) -> AppResult<Option<SeasonMeta>> {
        Ok(self.metas.get(&tmdb_id).cloned())
    }

    async fn list_genres(&self) -> AppResult<HashMap<i64, String>> {
        Ok(self.genres.clone())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub status_updates: UnboundedReceiver<StatusUpdate>,
}

pub async fn spawn_app(catalog: FixtureCatalog) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let catalog: Arc<dyn ShowCatalog> = Arc::new(catalog);
    let (queue, status_updates) = StatusCommandQueue::channel();

    let engine = Arc::new(EnrichmentEngine::new(
        Arc::clone(&catalog),
        store.clone(),
        queue,
    ));
    let genres = Arc::new(GenreTable::load(catalog.as_ref()).await);

    let state = AppState {
        store: store.clone(),
        catalog,
        engine,
        genres,
    };

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        store,
        status_updates,
    }
}

pub fn user_header(user: Uuid) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(USER_ID_HEADER),
        HeaderValue::from_str(&user.to_string()).unwrap(),
    )
}
