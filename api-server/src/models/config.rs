use anime_catalog_client::{CacheConfig, CatalogConfig, RetryPolicy};
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use simplelog::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;
use utils::url_builder::UrlBuilder;

pub const DEV_SESSION_SECRET: &str = "dev-only-session-secret";
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Figment(#[from] Box<figment::Error>),
    #[error("invalid catalog base url {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
}

#[serde_inline_default]
#[derive(Debug, Clone, Serialize, Deserialize, Getters, CopyGetters)]
pub struct Config {
    #[serde_inline_default(PathBuf::from("data/app.db"))]
    #[getset(get = "pub")]
    database_path: PathBuf,
    #[serde_inline_default(DEV_SESSION_SECRET.to_string())]
    #[getset(get = "pub")]
    session_secret: String,
    #[serde_inline_default(7 * 24)]
    #[getset(get_copy = "pub")]
    session_ttl_hours: u64,
    #[serde_inline_default("info".to_string())]
    #[getset(get = "pub")]
    log_level: String,
    #[serde(default)]
    #[getset(get = "pub")]
    catalog: CatalogSettings,
}

#[serde_inline_default]
#[derive(Debug, Clone, Serialize, Deserialize, Getters, CopyGetters)]
pub struct CatalogSettings {
    #[serde_inline_default(anime_catalog_client::JIKAN_BASE_URL.to_string())]
    #[getset(get = "pub")]
    base_url: String,
    #[serde_inline_default(60)]
    #[getset(get_copy = "pub")]
    search_ttl_secs: u64,
    #[serde_inline_default(600)]
    #[getset(get_copy = "pub")]
    item_ttl_secs: u64,
    #[serde_inline_default(3)]
    #[getset(get_copy = "pub")]
    max_attempts: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: anime_catalog_client::JIKAN_BASE_URL.to_string(),
            search_ttl_secs: 60,
            item_ttl_secs: 600,
            max_attempts: 3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/app.db"),
            session_secret: DEV_SESSION_SECRET.to_string(),
            session_ttl_hours: 7 * 24,
            log_level: "info".to_string(),
            catalog: CatalogSettings::default(),
        }
    }
}

impl Config {
    /// Defaults, then `config.yaml` (or the file named by `ANIME_CONFIG`),
    /// then `ANIME_*` environment variables. Nested keys use `__`, e.g.
    /// `ANIME_CATALOG__SEARCH_TTL_SECS=30`.
    pub fn figment() -> Figment {
        let file = std::env::var("ANIME_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());
        Figment::new()
            .merge(Yaml::file(file))
            .merge(Env::prefixed("ANIME_").ignore(&["CONFIG"]).split("__"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|err| ConfigError::Figment(Box::new(err)))
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.session_secret == DEV_SESSION_SECRET
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours as i64)
    }

    /// Unknown level names fall back to `Info`.
    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn catalog_config(&self) -> Result<CatalogConfig, ConfigError> {
        let settings = &self.catalog;
        let base_url = UrlBuilder::parse(&settings.base_url)
            .map_err(|err| ConfigError::BaseUrl {
                url: settings.base_url.clone(),
                reason: err.to_string(),
            })?
            .base()
            .clone();

        Ok(CatalogConfig {
            base_url,
            cache: CacheConfig {
                search_ttl: Duration::from_secs(settings.search_ttl_secs),
                item_ttl: Duration::from_secs(settings.item_ttl_secs),
            },
            retry: RetryPolicy::default().with_max_attempts(settings.max_attempts),
            ..CatalogConfig::default()
        })
    }
}
