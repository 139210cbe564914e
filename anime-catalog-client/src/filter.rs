//! Local post-filters and ordering applied to upstream results.

use crate::{Anime, CatalogQuery, CatalogSort};
use std::cmp::Ordering;

/// Applies genre, minimum rating and maximum episode filters in that order,
/// then sorts according to the query.
pub fn apply(items: Vec<Anime>, query: &CatalogQuery) -> Vec<Anime> {
    let genre = query.genre_filter();
    let mut items: Vec<Anime> = items
        .into_iter()
        .filter(|anime| genre.as_deref().map_or(true, |genre| anime.has_genre(genre)))
        .filter(|anime| query.min_rating().map_or(true, |min| anime.rating >= min))
        .filter(|anime| query.max_episodes().map_or(true, |max| anime.episodes <= max))
        .collect();
    sort(&mut items, query.sort());
    items
}

/// Stable sort, so equal keys keep their upstream order.
pub fn sort(items: &mut [Anime], sort: CatalogSort) {
    match sort {
        CatalogSort::RatingDesc => items.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        CatalogSort::RatingAsc => items.sort_by(|a, b| a.rating.total_cmp(&b.rating)),
        CatalogSort::TitleAsc => items.sort_by(compare_titles),
    }
}

fn compare_titles(a: &Anime, b: &Anime) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
}
