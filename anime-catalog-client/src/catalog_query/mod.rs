pub mod sort;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use sort::CatalogSort;

/// Filters and ordering for a catalog search. Built once, then only read.
#[derive(Debug, Clone, Default, PartialEq, Getters, CopyGetters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    #[getset(get = "pub")]
    text: Option<String>,
    #[getset(get = "pub")]
    genre: Option<String>,
    #[getset(get_copy = "pub")]
    min_rating: Option<f64>,
    #[getset(get_copy = "pub")]
    max_episodes: Option<u32>,
    #[getset(get_copy = "pub")]
    #[serde(default)]
    sort: CatalogSort,
}

impl CatalogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_min_rating(mut self, min_rating: f64) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    pub fn with_max_episodes(mut self, max_episodes: u32) -> Self {
        self.max_episodes = Some(max_episodes);
        self
    }

    pub fn with_sort(mut self, sort: CatalogSort) -> Self {
        self.sort = sort;
        self
    }

    /// Trimmed search text, `None` when absent or blank.
    pub fn search_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Trimmed, lowercased genre filter, `None` when absent or blank.
    pub fn genre_filter(&self) -> Option<String> {
        self.genre
            .as_deref()
            .map(str::trim)
            .filter(|genre| !genre.is_empty())
            .map(str::to_lowercase)
    }
}
