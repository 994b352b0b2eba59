use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::models::service_model::ServiceConfig;
use crate::state::app_state::AppState;

pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(info_check))
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthStatus {
    status: String,
    active_log: Option<String>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let active_log = {
        let cache = state.cache.lock().await;
        cache.active_path().map(|p| p.display().to_string())
    };

    Json(HealthStatus {
        status: "ok".to_owned(),
        active_log,
    })
}

async fn info_check(State(state): State<AppState>) -> Json<ServiceConfig> {
    debug!("{} requested", state.config.name);
    Json(state.config.as_ref().clone())
}
