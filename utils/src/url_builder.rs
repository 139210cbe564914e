use getset::Getters;
use url::{ParseError, Url};

/// Builds upstream URLs from a fixed base, appending path segments and query
/// parameters in insertion order so the same inputs always give the same URL.
#[derive(Debug, Clone, Getters)]
pub struct UrlBuilder {
    #[getset(get = "pub")]
    base: Url,
    segments: Vec<String>,
    params: Vec<(String, String)>,
}

impl UrlBuilder {
    pub fn parse(base: &str) -> Result<Self, ParseError> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        Ok(Self::new(base))
    }

    pub fn new(base: Url) -> Self {
        Self {
            base,
            segments: vec![],
            params: vec![],
        }
    }

    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn build(&self) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(self.segments.iter());
        }
        if !self.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_segments_to_base_path() {
        let url = UrlBuilder::parse("https://api.jikan.moe/v4")
            .unwrap()
            .segment("anime")
            .segment("5114")
            .build();
        assert_eq!(url.as_str(), "https://api.jikan.moe/v4/anime/5114");
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let url = UrlBuilder::parse("https://api.jikan.moe/v4/")
            .unwrap()
            .segment("anime")
            .build();
        assert_eq!(url.as_str(), "https://api.jikan.moe/v4/anime");
    }

    #[test]
    fn params_keep_insertion_order_and_are_encoded() {
        let url = UrlBuilder::parse("http://localhost:9000")
            .unwrap()
            .segment("anime")
            .param("q", "cowboy bebop")
            .param("limit", 25)
            .param("sfw", true)
            .build();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/anime?q=cowboy+bebop&limit=25&sfw=true"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(UrlBuilder::parse("mailto:someone@example.com").is_err());
        assert!(UrlBuilder::parse("not a url").is_err());
    }
}
