//! Wire types and endpoints of the Jikan v4 listing API.

use crate::{Anime, CatalogQuery};
use serde::Deserialize;
use utils::url_builder::UrlBuilder;
use utils::Url;

lazy_static::lazy_static! {
    pub static ref JIKAN_BASE_URL: Url =
        Url::parse("https://api.jikan.moe/v4").expect("static Jikan base url is valid");
}

/// Every Jikan payload wraps its result in `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JikanGenre {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JikanAnime {
    pub mal_id: u64,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<JikanGenre>,
    pub episodes: Option<u32>,
    pub score: Option<f64>,
}

impl From<JikanAnime> for Anime {
    fn from(source: JikanAnime) -> Self {
        Anime {
            id: source.mal_id.to_string(),
            title: source.title,
            genres: source.genres.into_iter().map(|genre| genre.name).collect(),
            episodes: source.episodes.unwrap_or(0),
            rating: source.score.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    base: Url,
    page_limit: u32,
}

impl Endpoints {
    pub fn new(base: Url, page_limit: u32) -> Self {
        Self { base, page_limit }
    }

    /// Text search when the query carries text, otherwise the top-rated listing.
    pub fn search(&self, query: &CatalogQuery) -> Url {
        let builder = UrlBuilder::new(self.base.clone());
        let builder = match query.search_text() {
            Some(text) => builder.segment("anime").param("q", text),
            None => builder
                .segment("top")
                .segment("anime")
                .param("order_by", "score")
                .param("sort", "desc"),
        };
        builder
            .param("limit", self.page_limit)
            .param("page", 1)
            .param("sfw", true)
            .build()
    }

    pub fn item(&self, id: &str) -> Url {
        UrlBuilder::new(self.base.clone())
            .segment("anime")
            .segment(id)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new(Url::parse("https://api.jikan.moe/v4").unwrap(), 25)
    }

    #[test]
    fn text_query_uses_search_endpoint() {
        let query = CatalogQuery::new().with_text("  frieren ");
        assert_eq!(
            endpoints().search(&query).as_str(),
            "https://api.jikan.moe/v4/anime?q=frieren&limit=25&page=1&sfw=true"
        );
    }

    #[test]
    fn blank_text_uses_top_listing() {
        let query = CatalogQuery::new().with_text("   ");
        assert_eq!(
            endpoints().search(&query).as_str(),
            "https://api.jikan.moe/v4/top/anime?order_by=score&sort=desc&limit=25&page=1&sfw=true"
        );
    }

    #[test]
    fn item_endpoint() {
        assert_eq!(
            endpoints().item("5114").as_str(),
            "https://api.jikan.moe/v4/anime/5114"
        );
    }

    #[test]
    fn normalizes_missing_fields_to_zero() {
        let raw: Envelope<JikanAnime> = serde_json::from_str(
            r#"{"data":{"mal_id":1,"title":"Cowboy Bebop","genres":[{"name":"Action"},{"name":"Sci-Fi"}],"episodes":null,"score":null}}"#,
        )
        .unwrap();
        let anime = Anime::from(raw.data);
        assert_eq!(anime.id, "1");
        assert_eq!(anime.genres, vec!["Action", "Sci-Fi"]);
        assert_eq!(anime.episodes, 0);
        assert_eq!(anime.rating, 0.0);
    }
}
