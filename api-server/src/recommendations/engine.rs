//! Genre-affinity recommendations built from a user's watchlist.

use crate::models::watchlist::{AnimeStatus, WatchlistEntry};
use anime_catalog_client::Anime;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const MAX_RECOMMENDATIONS: usize = 8;
pub const PREVIEW_SIZE: usize = 3;

const NO_SIGNAL_REASON: &str =
    "Strong public rating. Add watchlist activity to improve personalization.";
const GENERIC_REASON: &str = "Good overall match from your recent watchlist behavior.";
const PREVIEW_REASON: &str = "Popular in the community and strong genre overlap";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub anime_id: String,
    pub anime_title: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResponse {
    pub items: Vec<RecommendationItem>,
}

fn status_weight(status: AnimeStatus) -> f64 {
    match status {
        AnimeStatus::Completed => 1.3,
        AnimeStatus::Watching => 0.9,
        AnimeStatus::Plan => 0.3,
        AnimeStatus::Dropped => -0.8,
    }
}

fn entry_weight(entry: &WatchlistEntry) -> f64 {
    let rating_adjustment = entry.rating.map_or(0.0, |rating| (rating - 5.0) / 5.0);
    status_weight(entry.status) + rating_adjustment
}

fn genre_preferences(watchlist: &[WatchlistEntry]) -> HashMap<&str, f64> {
    let mut scores = HashMap::new();
    for entry in watchlist {
        let weight = entry_weight(entry);
        for genre in &entry.anime_genres {
            *scores.entry(genre.as_str()).or_insert(0.0) += weight;
        }
    }
    scores
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn reason_for(anime: &Anime, preferences: &HashMap<&str, f64>, has_signals: bool) -> String {
    if !has_signals {
        return NO_SIGNAL_REASON.to_string();
    }

    let mut ranked: Vec<(&str, f64)> = anime
        .genres
        .iter()
        .map(|genre| {
            let score = preferences.get(genre.as_str()).copied().unwrap_or(0.0);
            (genre.as_str(), score)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let top: Vec<&str> = ranked
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .take(2)
        .map(|(genre, _)| genre)
        .collect();

    if top.is_empty() {
        GENERIC_REASON.to_string()
    } else {
        format!("Matches your genre preferences: {}.", top.join(" and "))
    }
}

/// Score `candidates` against the genres on `watchlist`. Anime already on the
/// list are skipped; the best [`MAX_RECOMMENDATIONS`] are returned.
pub fn personalized(watchlist: &[WatchlistEntry], candidates: &[Anime]) -> RecommendationResponse {
    let watched: HashSet<&str> = watchlist.iter().map(|entry| entry.anime_id.as_str()).collect();
    let preferences = genre_preferences(watchlist);
    let has_signals = !watchlist.is_empty();

    let mut items: Vec<RecommendationItem> = candidates
        .iter()
        .filter(|anime| !watched.contains(anime.id.as_str()))
        .map(|anime| {
            let genre_match: f64 = anime
                .genres
                .iter()
                .map(|genre| preferences.get(genre.as_str()).copied().unwrap_or(0.0))
                .sum();
            RecommendationItem {
                anime_id: anime.id.clone(),
                anime_title: anime.title.clone(),
                score: round3(anime.rating / 10.0 + genre_match),
                reason: reason_for(anime, &preferences, has_signals),
            }
        })
        .collect();

    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items.truncate(MAX_RECOMMENDATIONS);
    RecommendationResponse { items }
}

/// Unpersonalized teaser: the first few entries of the top listing.
pub fn preview(top: &[Anime]) -> RecommendationResponse {
    let items = top
        .iter()
        .take(PREVIEW_SIZE)
        .map(|anime| RecommendationItem {
            anime_id: anime.id.clone(),
            anime_title: anime.title.clone(),
            score: anime.rating,
            reason: PREVIEW_REASON.to_string(),
        })
        .collect();
    RecommendationResponse { items }
}
