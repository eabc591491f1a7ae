use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

pub mod progress;
pub mod season;
pub mod show;

pub use progress::{max_watched_season, EpisodeKey, WatchMark};
pub use season::{EpisodeRef, SeasonMeta, SeasonSummary};
pub use show::{EnrichedShow, NewSeasonTag, NewTrackedShow, ShowStatus, TrackedShow};

/// Authenticated principal that owns watchlist and progress rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog search hit returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShowSummary {
    pub tmdb_id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub first_air_year: Option<i32>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub genres: Vec<String>,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Parses a TMDB date, which may be absent or an empty string
pub fn parse_tmdb_date(value: Option<&str>) -> Option<NaiveDate> {
    value
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Response of GET /search/tv
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbSearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResult {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}

impl TmdbSearchResult {
    /// Converts to a summary, resolving image paths against `image_base`
    pub fn into_summary(self, image_base: &str) -> ShowSummary {
        let image = |path: Option<String>| {
            path.filter(|p| !p.is_empty())
                .map(|p| format!("{}{}", image_base.trim_end_matches('/'), p))
        };

        ShowSummary {
            tmdb_id: self.id,
            title: self.name,
            overview: self.overview.filter(|o| !o.is_empty()),
            poster_url: image(self.poster_path),
            backdrop_url: image(self.backdrop_path),
            first_air_year: parse_tmdb_date(self.first_air_date.as_deref()).map(|d| d.year()),
            genre_ids: self.genre_ids,
            genres: Vec::new(),
        }
    }
}

/// Response of GET /tv/{id}, limited to the season fields we consume
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbShowDetails {
    pub id: i64,
    #[serde(default)]
    pub number_of_seasons: Option<i32>,
    #[serde(default)]
    pub next_episode_to_air: Option<TmdbEpisode>,
    #[serde(default)]
    pub last_episode_to_air: Option<TmdbEpisode>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbEpisode {
    pub season_number: i32,
    pub episode_number: i32,
    #[serde(default)]
    pub air_date: Option<String>,
}

impl From<TmdbEpisode> for EpisodeRef {
    fn from(episode: TmdbEpisode) -> Self {
        EpisodeRef {
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            air_date: parse_tmdb_date(episode.air_date.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSeason {
    pub season_number: i32,
    #[serde(default)]
    pub episode_count: i32,
    #[serde(default)]
    pub air_date: Option<String>,
}

impl From<TmdbShowDetails> for SeasonMeta {
    fn from(details: TmdbShowDetails) -> Self {
        let seasons: Vec<SeasonSummary> = details
            .seasons
            .into_iter()
            .map(|s| SeasonSummary {
                season_number: s.season_number,
                episode_count: s.episode_count,
                air_date: parse_tmdb_date(s.air_date.as_deref()),
            })
            .collect();

        // Season 0 holds specials
        let regular = || seasons.iter().filter(|s| s.season_number > 0);

        let latest_season_premiere_date = regular()
            .max_by_key(|s| s.season_number)
            .and_then(|s| s.air_date);

        let number_of_seasons = details
            .number_of_seasons
            .unwrap_or_else(|| regular().count() as i32);

        SeasonMeta {
            next_episode: details.next_episode_to_air.map(EpisodeRef::from),
            last_episode: details.last_episode_to_air.map(EpisodeRef::from),
            number_of_seasons,
            latest_season_premiere_date,
            seasons,
        }
    }
}

/// Response of GET /genre/tv/list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}
