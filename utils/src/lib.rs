pub mod surf_logging;
pub mod url_builder;

pub use url::Url;
