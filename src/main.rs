use anyhow::Context;
use axum::Router;
use tracing::info;

mod models;
mod routes;
mod state;
mod utils;

use crate::state::app_state::AppState;
use crate::utils::conf_helper::{init_config_and_bind, parse_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // === CONFIG + LISTENER ===
    let startup = init_config_and_bind()
        .await
        .context("CRITICAL INIT FAILURE")?;
    let config = startup.config;

    tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.log_level)?)
        .init();

    match &startup.config_file {
        Some(path) => info!("Config loaded from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    info!(
        "Server initialized on {}:{}",
        config.connection.ip, config.connection.port
    );

    let state = AppState::new(config);

    let app = Router::new()
        .merge(routes::info_routes::health_routes(state.clone()))
        .merge(routes::data_routes::data_routes(state));

    axum::serve(startup.listener, app).await?;
    Ok(())
}
