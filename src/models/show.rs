use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

/// Watchlist status of a tracked show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShowStatus {
    Watching,
    PlanToWatch,
    Completed,
    OnHold,
    Dropped,
    /// Any stored value this build does not recognize
    #[serde(other)]
    Unknown,
}

impl ShowStatus {
    /// Display priority tier, lower sorts first
    pub fn tier(self) -> u8 {
        match self {
            ShowStatus::Watching => 0,
            ShowStatus::PlanToWatch => 1,
            ShowStatus::OnHold => 2,
            ShowStatus::Completed => 3,
            ShowStatus::Dropped => 4,
            ShowStatus::Unknown => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShowStatus::Watching => "watching",
            ShowStatus::PlanToWatch => "plan_to_watch",
            ShowStatus::Completed => "completed",
            ShowStatus::OnHold => "on_hold",
            ShowStatus::Dropped => "dropped",
            ShowStatus::Unknown => "unknown",
        }
    }

    /// Parses a stored status, mapping unrecognized values to `Unknown`
    pub fn from_db(value: &str) -> Self {
        value.parse().unwrap_or(ShowStatus::Unknown)
    }
}

impl Display for ShowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "watching" => Ok(ShowStatus::Watching),
            "plan_to_watch" => Ok(ShowStatus::PlanToWatch),
            "completed" => Ok(ShowStatus::Completed),
            "on_hold" => Ok(ShowStatus::OnHold),
            "dropped" => Ok(ShowStatus::Dropped),
            other => Err(format!("unknown show status '{}'", other)),
        }
    }
}

/// A show on a user's watchlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedShow {
    pub id: Uuid,
    pub tmdb_id: i64,
    pub title: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub status: ShowStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when adding a show to the watchlist
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NewTrackedShow {
    pub tmdb_id: i64,
    pub title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub backdrop_url: Option<String>,
    #[serde(default = "default_new_status")]
    pub status: ShowStatus,
}

fn default_new_status() -> ShowStatus {
    ShowStatus::PlanToWatch
}

/// New-season marker shown next to a tracked show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NewSeasonTag {
    /// Next season premieres within three months
    Soon,
    /// Latest season premiered within the last three months
    Out,
}

/// A tracked show augmented with catalog-derived display data
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrichedShow {
    #[serde(flatten)]
    pub show: TrackedShow,
    pub new_season_tag: Option<NewSeasonTag>,
    pub next_episode_air_date: Option<NaiveDate>,
    pub last_episode_air_date: Option<NaiveDate>,
    pub latest_season_premiere_date: Option<NaiveDate>,
    pub has_upcoming_episodes_in_current_season: bool,
}

impl EnrichedShow {
    /// Wraps a show with empty enrichment, used when no catalog data is available
    pub fn bare(show: TrackedShow) -> Self {
        Self {
            show,
            new_season_tag: None,
            next_episode_air_date: None,
            last_episode_air_date: None,
            latest_season_premiere_date: None,
            has_upcoming_episodes_in_current_season: false,
        }
    }
}
