//! Reference Store - modification-time keyed cache of the reference index
//!
//! The three reference files are read once and reused until one of them
//! changes on disk. The cached index is an immutable `Arc` shared read-only
//! by concurrent requests.

use crate::data::{ReferenceIndex, ReferencePaths};
use crate::error::AnalysisError;
use moka::future::Cache;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// Modification times of the three reference files (`None` = missing)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceFingerprint {
    traits: Option<SystemTime>,
    ecology: Option<SystemTime>,
    syntaxons: Option<SystemTime>,
}

impl ReferenceFingerprint {
    pub fn of(paths: &ReferencePaths) -> Self {
        fn modified(path: &Path) -> Option<SystemTime> {
            std::fs::metadata(path).and_then(|m| m.modified()).ok()
        }

        Self {
            traits: modified(&paths.traits),
            ecology: modified(&paths.ecology),
            syntaxons: modified(&paths.syntaxons),
        }
    }
}

/// Loads and caches the reference index for the API server
pub struct ReferenceStore {
    paths: ReferencePaths,
    cache: Cache<ReferenceFingerprint, Arc<ReferenceIndex>>,
}

impl ReferenceStore {
    pub fn new(paths: ReferencePaths) -> Self {
        let cache = Cache::builder()
            .max_capacity(2) // current snapshot + one being replaced
            .build();

        Self { paths, cache }
    }

    /// Current reference snapshot, reloading when a file changed
    pub async fn get(&self) -> Result<Arc<ReferenceIndex>, AnalysisError> {
        let fingerprint = ReferenceFingerprint::of(&self.paths);

        if let Some(cached) = self.cache.get(&fingerprint).await {
            tracing::debug!("Reference cache hit");
            return Ok(cached);
        }

        tracing::info!("Loading reference data from {:?}", self.paths.traits.parent());
        let paths = self.paths.clone();
        let index = tokio::task::spawn_blocking(move || ReferenceIndex::load(&paths))
            .await
            .map_err(|e| AnalysisError::Internal(anyhow::anyhow!("Reference loading task failed: {}", e)))??;

        let index = Arc::new(index);
        self.cache.invalidate_all();
        self.cache.insert(fingerprint, index.clone()).await;

        Ok(index)
    }
}
