mod api;
mod auth;
mod db;
mod error;
mod fairings;
mod models;
mod recommendations;
mod validation;
mod watchlist;

#[cfg(test)]
mod tests;

use anime_catalog_client::CatalogClient;
use db::Database;
use error::StartupError;
use log::{error, info};
use models::config::Config;
use models::context::{Context, ContextPointer};
use rocket::{Build, Rocket};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::sync::Arc;

fn init_logging(config: &Config) {
    let log_config = simplelog::ConfigBuilder::new()
        .add_filter_ignore_str("rocket")
        .add_filter_ignore_str("hyper")
        .build();
    if let Err(err) = TermLogger::init(
        config.log_level_filter(),
        log_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Logger already initialized: {}", err);
    }
}

async fn build_context(config: Config) -> Result<ContextPointer, StartupError> {
    let database = Database::open(config.database_path())?;
    let applied = database.run_migrations()?;
    if !applied.is_empty() {
        info!("Applied migrations: {}", applied.join(", "));
    }
    auth::users::ensure_demo_user(&database).await?;

    let catalog_client = CatalogClient::new(config.catalog_config()?);
    Ok(Arc::new(Context::new(catalog_client, database, config)))
}

fn build_rocket(context: ContextPointer) -> Rocket<Build> {
    let schema = api::build_schema(context.clone());
    rocket::build()
        .manage(context)
        .manage(schema)
        .attach(fairings::RequestLogger)
        .attach(fairings::Cors)
        .mount("/", api::routes())
        .mount("/", rocket::routes![fairings::preflight])
        .register("/", api::catchers())
}

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };
    init_logging(&config);

    let context = match build_context(config).await {
        Ok(context) => context,
        Err(err) => {
            error!("Failed to start: {}", err);
            std::process::exit(1);
        }
    };

    let _rocket = build_rocket(context).launch().await?;
    Ok(())
}
