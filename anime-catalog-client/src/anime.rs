use serde::{Deserialize, Serialize};

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// A catalog entry in the shape the rest of the application works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct Anime {
    pub id: String,
    pub title: String,
    pub genres: Vec<String>,
    pub episodes: u32,
    /// Public score in `[0, 10]`, `0` when the upstream has none.
    pub rating: f64,
}

impl Anime {
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres
            .iter()
            .any(|entry| entry.to_lowercase() == genre.to_lowercase())
    }
}
