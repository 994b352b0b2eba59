use std::sync::Arc;
use tokio::sync::Mutex;

use canlog::{SeriesStore, StoreCache};

use crate::models::service_model::ServiceConfig;
use crate::routes::api_error::ApiError;

#[derive(Clone)]
pub struct AppState {
    /// The one active log; loading another path replaces it.
    pub cache: Arc<Mutex<StoreCache>>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            cache: Arc::new(Mutex::new(StoreCache::new())),
            config: Arc::new(config),
        }
    }

    /// Snapshot of the active store; the cache lock is released on return.
    pub async fn active_store(&self) -> Result<Arc<SeriesStore>, ApiError> {
        let cache = self.cache.lock().await;
        cache
            .current()
            .map(|cached| cached.store.clone())
            .ok_or(ApiError::NoActiveLog)
    }
}
