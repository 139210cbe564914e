pub mod engine;

pub use engine::{personalized, preview, RecommendationItem, RecommendationResponse};
