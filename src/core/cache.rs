// Path-keyed cache of the active parsed store

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::parser::{LogParser, ParseOptions};
use crate::core::store::SeriesStore;

/// A parsed store handed out by [`StoreCache`].
#[derive(Debug, Clone)]
pub struct CachedStore {
    pub id: Uuid,
    pub path: PathBuf,
    pub loaded_at: DateTime<Utc>,
    pub store: Arc<SeriesStore>,
}

/// Holds the store for one active log path.
///
/// Loading a different path drops the previous entry before parsing, so a
/// failed load leaves the cache empty rather than serving stale data.
#[derive(Debug, Default)]
pub struct StoreCache {
    active: Option<CachedStore>,
}

impl StoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: impl AsRef<Path>, options: ParseOptions) -> Result<CachedStore> {
        let path = path.as_ref();

        if let Some(cached) = &self.active {
            if cached.path == path {
                return Ok(cached.clone());
            }
        }

        if let Some(previous) = self.active.take() {
            info!(
                "Active log changed from {} to {}, dropping cached store {}",
                previous.path.display(),
                path.display(),
                previous.id
            );
        }

        let store = LogParser::new(options).parse(path)?;
        let cached = CachedStore {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            loaded_at: Utc::now(),
            store: Arc::new(store),
        };
        info!("Cached {} as {}", cached.path.display(), cached.id);

        self.active = Some(cached.clone());
        Ok(cached)
    }

    pub fn current(&self) -> Option<&CachedStore> {
        self.active.as_ref()
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|c| c.path.as_path())
    }

    /// Forget the active store; the next `load` parses again.
    pub fn invalidate(&mut self) -> Option<CachedStore> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CanlogError;

    fn write_log(dir: &Path, name: &str, value: f64) -> PathBuf {
        let path = dir.join(name);
        let text = format!("header\nValue 1: Speed (vcu.speed)\n0,1,{}\n10,1,{}\n", value, value);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_same_path_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_log(dir.path(), "a.csv", 1.0);

        let mut cache = StoreCache::new();
        let first = cache.load(&a, ParseOptions::default()).unwrap();
        let second = cache.load(&a, ParseOptions::default()).unwrap();
        assert_eq!(first.id, second.id);
        assert!(Arc::ptr_eq(&first.store, &second.store));
        assert_eq!(cache.active_path(), Some(a.as_path()));
    }

    #[test]
    fn test_path_change_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_log(dir.path(), "a.csv", 1.0);
        let b = write_log(dir.path(), "b.csv", 2.0);

        let mut cache = StoreCache::new();
        let first = cache.load(&a, ParseOptions::default()).unwrap();
        let other = cache.load(&b, ParseOptions::default()).unwrap();
        assert_ne!(first.id, other.id);
        assert_eq!(other.store.get("vcu.speed").unwrap().values(), &[2.0, 2.0]);

        // going back re-parses
        let back = cache.load(&a, ParseOptions::default()).unwrap();
        assert_ne!(back.id, first.id);
        assert!(!Arc::ptr_eq(&back.store, &first.store));
    }

    #[test]
    fn test_explicit_invalidate_and_failed_load() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_log(dir.path(), "a.csv", 1.0);

        let mut cache = StoreCache::new();
        let first = cache.load(&a, ParseOptions::default()).unwrap();
        assert_eq!(cache.invalidate().map(|c| c.id), Some(first.id));
        assert!(cache.current().is_none());

        cache.load(&a, ParseOptions::default()).unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            cache.load(&missing, ParseOptions::default()),
            Err(CanlogError::Io(_))
        ));
        assert!(cache.current().is_none());
    }
}
