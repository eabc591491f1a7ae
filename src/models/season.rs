use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::EpisodeKey;

/// Upper bound on episodes taken from a single season of catalog data
pub const MAX_EPISODES_PER_SEASON: i32 = 1000;

/// A single episode reference from the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRef {
    pub season_number: i32,
    pub episode_number: i32,
    pub air_date: Option<NaiveDate>,
}

/// Summary of one season as listed on the show details
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonSummary {
    pub season_number: i32,
    pub episode_count: i32,
    pub air_date: Option<NaiveDate>,
}

/// Point-in-time season/episode snapshot of a show
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SeasonMeta {
    pub next_episode: Option<EpisodeRef>,
    /// Most recently aired episode as of fetch time
    pub last_episode: Option<EpisodeRef>,
    /// Count of regular (non-special) seasons
    pub number_of_seasons: i32,
    /// Air date of the highest-numbered regular season
    pub latest_season_premiere_date: Option<NaiveDate>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
}

impl SeasonMeta {
    /// Every regular episode that has aired up to and including the last aired episode.
    ///
    /// Seasons before the last aired one contribute all of their listed episodes; the
    /// season of the last aired episode contributes episodes up to that one.
    pub fn aired_episodes(&self) -> Vec<EpisodeKey> {
        let Some(last) = self.last_episode else {
            return Vec::new();
        };

        let mut seasons: Vec<&SeasonSummary> = self
            .seasons
            .iter()
            .filter(|s| s.season_number > 0 && s.season_number < last.season_number)
            .collect();
        seasons.sort_by_key(|s| s.season_number);

        let mut episodes: Vec<EpisodeKey> = seasons
            .into_iter()
            .flat_map(|s| {
                (1..=s.episode_count.min(MAX_EPISODES_PER_SEASON))
                    .map(move |e| EpisodeKey::new(s.season_number, e))
            })
            .collect();

        if last.season_number > 0 {
            episodes.extend(
                (1..=last.episode_number.min(MAX_EPISODES_PER_SEASON))
                    .map(|e| EpisodeKey::new(last.season_number, e)),
            );
        }

        episodes
    }
}
