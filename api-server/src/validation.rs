use crate::error::ApiError;
use crate::models::watchlist::AnimeStatus;
use anime_catalog_client::{CatalogQuery, CatalogSort};
use regex::Regex;
use std::str::FromStr;

lazy_static::lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid");
}

pub const MAX_NOTES_CHARS: usize = 500;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn is_valid_rating(rating: f64) -> bool {
    (0.0..=10.0).contains(&rating)
}

pub fn parse_status(input: &str) -> Result<AnimeStatus, ApiError> {
    AnimeStatus::from_str(input).map_err(|_| ApiError::bad_request("invalid status value"))
}

/// Unknown or missing sort names fall back to `rating_desc`.
pub fn parse_catalog_sort(input: Option<&str>) -> CatalogSort {
    input
        .and_then(|sort| CatalogSort::from_str(sort).ok())
        .unwrap_or_default()
}

pub fn parse_float(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

pub fn parse_positive_int(input: &str) -> Option<u32> {
    input.trim().parse::<u32>().ok().filter(|value| *value > 0)
}

/// Trim and cap free-text notes.
pub fn clean_notes(notes: &str) -> String {
    notes.trim().chars().take(MAX_NOTES_CHARS).collect()
}

/// Raw query-string values for a catalog search.
#[derive(Debug, Default, Clone)]
pub struct CatalogParams<'a> {
    pub q: Option<&'a str>,
    pub genre: Option<&'a str>,
    pub min_rating: Option<&'a str>,
    pub max_episodes: Option<&'a str>,
    pub sort: Option<&'a str>,
}

pub fn catalog_query(params: CatalogParams<'_>) -> Result<CatalogQuery, ApiError> {
    let mut query = CatalogQuery::new().with_sort(parse_catalog_sort(params.sort));

    if let Some(q) = params.q {
        query = query.with_text(q);
    }
    if let Some(genre) = params.genre {
        query = query.with_genre(genre);
    }
    if let Some(raw) = params.min_rating {
        let min_rating = parse_float(raw)
            .filter(|value| is_valid_rating(*value))
            .ok_or_else(|| ApiError::bad_request("minRating must be a number between 0 and 10"))?;
        query = query.with_min_rating(min_rating);
    }
    if let Some(raw) = params.max_episodes {
        let max_episodes = parse_positive_int(raw)
            .ok_or_else(|| ApiError::bad_request("maxEpisodes must be a positive integer"))?;
        query = query.with_max_episodes(max_episodes);
    }

    Ok(query)
}
