//! Display rules applied to a user's watchlist on every render.
//!
//! Everything here is pure: tags and ordering are computed from a show, its season
//! snapshot, the user's highest watched season and the evaluation time.

use std::cmp::Ordering;

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};

use crate::models::{EnrichedShow, NewSeasonTag, SeasonMeta, ShowStatus, TrackedShow};

/// Width of the "soon" and "out" windows
const NEW_SEASON_WINDOW: Months = Months::new(3);

/// Catalog dates are calendar days; they compare as midnight UTC
fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Tags derived from one show's season snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowTags {
    pub new_season_tag: Option<NewSeasonTag>,
    pub has_upcoming_episodes_in_current_season: bool,
    pub next_episode_air_date: Option<NaiveDate>,
    pub last_episode_air_date: Option<NaiveDate>,
    pub latest_season_premiere_date: Option<NaiveDate>,
}

/// Computes the display tags of a show.
///
/// `max_watched_season` is the highest season among the user's watch marks for the show,
/// `None` when there are none or when watch data is unavailable.
pub fn compute_tags(
    meta: &SeasonMeta,
    max_watched_season: Option<i32>,
    now: DateTime<Utc>,
) -> ShowTags {
    let three_months_later = now
        .checked_add_months(NEW_SEASON_WINDOW)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let three_months_ago = now
        .checked_sub_months(NEW_SEASON_WINDOW)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let next = meta.next_episode.as_ref();
    let last = meta.last_episode.as_ref();
    let next_air = next.and_then(|e| e.air_date).map(day_start);

    let has_upcoming_episodes_in_current_season = match (next, last, next_air) {
        (Some(next), Some(last), Some(air)) => {
            air > now && next.season_number == last.season_number
        }
        _ => false,
    };

    let last_season = last.map(|e| e.season_number).unwrap_or(0);
    let premieres_soon = match (next, next_air) {
        (Some(next), Some(air)) => {
            next.season_number > last_season && air > now && air <= three_months_later
        }
        _ => false,
    };

    let new_season_tag = if premieres_soon {
        Some(NewSeasonTag::Soon)
    } else if premiered_recently(meta, max_watched_season, now, three_months_ago) {
        Some(NewSeasonTag::Out)
    } else {
        None
    };

    ShowTags {
        new_season_tag,
        has_upcoming_episodes_in_current_season,
        next_episode_air_date: next.and_then(|e| e.air_date),
        last_episode_air_date: last.and_then(|e| e.air_date),
        latest_season_premiere_date: meta.latest_season_premiere_date,
    }
}

/// True when the latest season premiered in `[three_months_ago, now]` and the user has
/// not already reached it
fn premiered_recently(
    meta: &SeasonMeta,
    max_watched_season: Option<i32>,
    now: DateTime<Utc>,
    three_months_ago: DateTime<Utc>,
) -> bool {
    let Some(premiere) = meta.latest_season_premiere_date.map(day_start) else {
        return false;
    };

    if meta.number_of_seasons <= 1 {
        return false;
    }

    if max_watched_season.is_some_and(|season| season >= meta.number_of_seasons) {
        return false;
    }

    premiere >= three_months_ago && premiere <= now
}

/// Combines a show with its tags
pub fn enrich_show(show: TrackedShow, tags: ShowTags) -> EnrichedShow {
    EnrichedShow {
        show,
        new_season_tag: tags.new_season_tag,
        next_episode_air_date: tags.next_episode_air_date,
        last_episode_air_date: tags.last_episode_air_date,
        latest_season_premiere_date: tags.latest_season_premiere_date,
        has_upcoming_episodes_in_current_season: tags.has_upcoming_episodes_in_current_season,
    }
}

/// Status the show should move to on its own, if any.
///
/// The only automatic move is completed → watching once new episodes of the current
/// season are scheduled. New-season tags never change status.
pub fn auto_transition(show: &EnrichedShow) -> Option<ShowStatus> {
    match show.show.status {
        ShowStatus::Completed if show.has_upcoming_episodes_in_current_season => {
            Some(ShowStatus::Watching)
        }
        _ => None,
    }
}

/// Most recent catalog activity of a show: last aired episode, else latest premiere
fn recency(show: &EnrichedShow) -> Option<NaiveDate> {
    show.last_episode_air_date.or(show.latest_season_premiere_date)
}

/// Display order: status tier, then most recent activity first, then newest added first
pub fn compare_for_display(a: &EnrichedShow, b: &EnrichedShow) -> Ordering {
    a.show
        .status
        .tier()
        .cmp(&b.show.status.tier())
        .then_with(|| match (recency(a), recency(b)) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.show.created_at.cmp(&a.show.created_at))
}

/// Sorts in display order; full ties keep their input order
pub fn sort_for_display(shows: &mut [EnrichedShow]) {
    shows.sort_by(compare_for_display);
}
