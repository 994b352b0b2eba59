use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info};

use canlog::{stats, ParseOptions, SearchHit, SeriesStats, SignalInfo, TimeRange, TimeUnit};

use crate::models::service_model::{FileReadRequest, FileReadResponse, SearchQuery, StatsQuery};
use crate::routes::api_error::ApiError;
use crate::routes::ws_handler::handle_ws_fetch;
use crate::state::app_state::AppState;

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/read-file", post(read_file))
        .route("/signals", get(list_signals))
        .route("/search", get(search_signals))
        .route("/stats/{signal}", get(signal_stats))
        .route("/fetch/{signal}", get(ws_fetch))
        .with_state(state)
}

async fn read_file(
    State(state): State<AppState>,
    Json(request): Json<FileReadRequest>,
) -> Result<Json<FileReadResponse>, ApiError> {
    let max_errors = request.max_errors.unwrap_or(state.config.max_errors);
    debug!("Reading file: path={}, max_errors={}", request.path, max_errors);

    let cached = {
        let mut cache = state.cache.lock().await;
        // parsing is synchronous; keep it off the async workers
        tokio::task::block_in_place(|| {
            cache.load(&request.path, ParseOptions::with_max_errors(max_errors))
        })?
    };

    let name = cached
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());
    info!("Serving {} ({} signals)", name, cached.store.len());

    Ok(Json(FileReadResponse {
        id: cached.id.to_string(),
        name,
        path: cached.path.display().to_string(),
        loaded_at: cached.loaded_at.to_rfc3339(),
        summary: cached.store.summary(TimeUnit::Seconds),
        signals: cached.store.signals(),
    }))
}

async fn list_signals(State(state): State<AppState>) -> Result<Json<Vec<SignalInfo>>, ApiError> {
    let store = state.active_store().await?;
    Ok(Json(store.signals()))
}

async fn search_signals(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let store = state.active_store().await?;
    Ok(Json(store.search(&query.q)?))
}

async fn signal_stats(
    State(state): State<AppState>,
    Path(signal): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<SeriesStats>, ApiError> {
    let store = state.active_store().await?;
    let series = store.get(signal.as_str())?;

    let range = TimeRange::from_unit(
        query.start.unwrap_or(0.0),
        query.end.unwrap_or(-1.0),
        query.unit,
    );
    Ok(Json(stats(series, range, query.unit)?))
}

async fn ws_fetch(
    State(state): State<AppState>,
    Path(signal): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let store = state.active_store().await?;
    let series = store.get(signal.as_str())?.clone();

    Ok(ws
        .on_upgrade(move |socket| handle_ws_fetch(socket, series))
        .into_response())
}
