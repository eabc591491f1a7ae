/// Show catalog abstraction
///
/// The catalog is the read-only source of show metadata: search results, per-show
/// season snapshots and the genre list. The TMDB implementation lives in `tmdb`.
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{SeasonMeta, ShowSummary},
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ShowCatalog: Send + Sync {
    /// Search shows by name
    async fn search_shows(&self, query: &str) -> AppResult<Vec<ShowSummary>>;

    /// Season/episode snapshot of one show
    ///
    /// Returns `Ok(None)` when the catalog does not know the show. Transient failures
    /// are errors; callers that only decorate data treat both the same way.
    async fn get_season_meta(&self, tmdb_id: i64) -> AppResult<Option<SeasonMeta>>;

    /// Genre id to display name
    async fn list_genres(&self) -> AppResult<HashMap<i64, String>>;

    /// Catalog name for logging
    fn name(&self) -> &'static str;
}
