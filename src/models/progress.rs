use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Composite per-show key of an episode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeKey {
    pub season: i32,
    pub episode: i32,
}

impl EpisodeKey {
    pub fn new(season: i32, episode: i32) -> Self {
        Self { season, episode }
    }
}

impl Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}e{}", self.season, self.episode)
    }
}

impl FromStr for EpisodeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid episode key '{}'", s);
        let rest = s.strip_prefix('s').ok_or_else(invalid)?;
        let (season, episode) = rest.split_once('e').ok_or_else(invalid)?;
        Ok(Self {
            season: season.parse().map_err(|_| invalid())?,
            episode: episode.parse().map_err(|_| invalid())?,
        })
    }
}

/// Record that a user has watched one episode of a show
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchMark {
    pub tmdb_id: i64,
    pub season_number: i32,
    pub episode_number: i32,
    pub watched_at: DateTime<Utc>,
}

impl WatchMark {
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey::new(self.season_number, self.episode_number)
    }
}

/// Highest season number among a show's watch marks
pub fn max_watched_season<'a, I>(marks: I) -> Option<i32>
where
    I: IntoIterator<Item = &'a WatchMark>,
{
    marks.into_iter().map(|m| m.season_number).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_key_display_and_parse() {
        let key = EpisodeKey::new(3, 12);
        assert_eq!(key.to_string(), "s3e12");
        assert_eq!("s3e12".parse::<EpisodeKey>().unwrap(), key);
    }

    #[test]
    fn test_episode_key_parse_rejects_garbage() {
        assert!("3x12".parse::<EpisodeKey>().is_err());
        assert!("s3".parse::<EpisodeKey>().is_err());
        assert!("sxe1".parse::<EpisodeKey>().is_err());
    }

    #[test]
    fn test_episode_key_ordering() {
        let mut keys = vec![
            EpisodeKey::new(2, 1),
            EpisodeKey::new(1, 10),
            EpisodeKey::new(1, 2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                EpisodeKey::new(1, 2),
                EpisodeKey::new(1, 10),
                EpisodeKey::new(2, 1)
            ]
        );
    }

    #[test]
    fn test_max_watched_season() {
        let mark = |season| WatchMark {
            tmdb_id: 1,
            season_number: season,
            episode_number: 1,
            watched_at: Utc::now(),
        };
        let marks = vec![mark(1), mark(3), mark(2)];
        assert_eq!(max_watched_season(&marks), Some(3));
        assert_eq!(max_watched_season(&Vec::<WatchMark>::new()), None);
    }
}
