/// TMDB catalog
///
/// API flow:
/// 1. Search: /search/tv → show summaries
/// 2. Seasons: /tv/{id} → next/last episode and the season list
/// 3. Genres: /genre/tv/list → id to name table
///
/// Responses are cached in Redis through the `cached!` macro.
use std::collections::HashMap;

use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        SeasonMeta, ShowSummary, TmdbGenreList, TmdbSearchResponse, TmdbShowDetails,
    },
    services::catalog::ShowCatalog,
};

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const SEASON_CACHE_TTL: u64 = 21600; // 6 hours
const GENRE_CACHE_TTL: u64 = 604800; // 1 week
const LANGUAGE: &str = "en-US";

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    image_url: String,
    cache: Cache,
}

impl TmdbCatalog {
    pub fn new(cache: Cache, api_key: String, api_url: String, image_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            image_url,
            cache,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }

    /// GETs a TMDB endpoint and decodes the JSON body
    ///
    /// A 404 maps to `NotFound`, any other non-success status to `ExternalApi`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let response = self
            .http_client
            .get(self.endpoint(path))
            .query(&[("api_key", self.api_key.as_str()), ("language", LANGUAGE)])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {} not found", path)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "TMDB request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(path = %path, error = %e, "Failed to deserialize TMDB response");
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }

    async fn fetch_season_meta(&self, tmdb_id: i64) -> AppResult<SeasonMeta> {
        cached!(
            self.cache,
            CacheKey::SeasonMeta(tmdb_id),
            SEASON_CACHE_TTL,
            async move {
                let details: TmdbShowDetails =
                    self.get_json(&format!("/tv/{}", tmdb_id), &[]).await?;
                let meta = SeasonMeta::from(details);

                tracing::debug!(
                    tmdb_id,
                    seasons = meta.number_of_seasons,
                    has_next = meta.next_episode.is_some(),
                    catalog = "tmdb",
                    "Season metadata fetched"
                );

                Ok::<_, AppError>(meta)
            }
        )
    }

    async fn fetch_genres(&self) -> AppResult<TmdbGenreList> {
        cached!(
            self.cache,
            CacheKey::Genres,
            GENRE_CACHE_TTL,
            self.get_json::<TmdbGenreList>("/genre/tv/list", &[])
        )
    }
}

#[async_trait::async_trait]
impl ShowCatalog for TmdbCatalog {
    async fn search_shows(&self, query: &str) -> AppResult<Vec<ShowSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::ShowSearch(query.to_string()),
            SEARCH_CACHE_TTL,
            async move {
                let response: TmdbSearchResponse = self
                    .get_json("/search/tv", &[("query", query), ("include_adult", "false")])
                    .await?;

                let shows: Vec<ShowSummary> = response
                    .results
                    .into_iter()
                    .map(|r| r.into_summary(&self.image_url))
                    .collect();

                tracing::info!(
                    query = %query,
                    results = shows.len(),
                    catalog = "tmdb",
                    "Show search completed"
                );

                Ok::<_, AppError>(shows)
            }
        )
    }

    async fn get_season_meta(&self, tmdb_id: i64) -> AppResult<Option<SeasonMeta>> {
        match self.fetch_season_meta(tmdb_id).await {
            Ok(meta) => Ok(Some(meta)),
            Err(AppError::NotFound(_)) => {
                tracing::debug!(tmdb_id, "Show not found in TMDB");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_genres(&self) -> AppResult<HashMap<i64, String>> {
        let list = self.fetch_genres().await?;
        Ok(list.genres.into_iter().map(|g| (g.id, g.name)).collect())
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
