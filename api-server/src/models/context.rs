use super::config::Config;
use crate::auth::session::SessionKeys;
use crate::db::Database;
use anime_catalog_client::CatalogClient;
use getset::Getters;
use log::{info, warn};
use std::sync::Arc;

#[derive(Getters)]
#[get = "pub"]
pub struct Context {
    catalog_client: CatalogClient,
    database: Database,
    sessions: SessionKeys,
    config: Config,
}

impl Context {
    pub fn new(catalog_client: CatalogClient, database: Database, config: Config) -> Self {
        let cache = &catalog_client.config().cache;
        info!(
            "Initialized CatalogClient with caching (search TTL: {}s, item TTL: {}s)",
            cache.search_ttl.as_secs(),
            cache.item_ttl.as_secs()
        );

        if config.uses_dev_secret() {
            warn!("Signing sessions with the development secret, set ANIME_SESSION_SECRET");
        }
        let sessions = SessionKeys::new(config.session_secret(), config.session_ttl());

        Self {
            catalog_client,
            database,
            sessions,
            config,
        }
    }
}

pub type ContextPointer = Arc<Context>;
