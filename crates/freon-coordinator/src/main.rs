//! Freon coordinator daemon.

use std::path::Path;

use actix_web::{web, App, HttpServer};
use tracing::info;

use freon_coordinator::config::CoordinatorConfig;
use freon_coordinator::{routes, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("freon=info".parse()?),
        )
        .init();

    let config = CoordinatorConfig::load()?;
    info!(hostname = %config.hostname, database = %config.database, "coordinator starting");

    let db = freon_db::open(Path::new(&config.database))?;
    let state = web::Data::new(AppState::new(db));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(&config.hostname)?
    .run()
    .await?;

    Ok(())
}
