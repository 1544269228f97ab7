use std::sync::Arc;

use chainstatus_cache::{CacheRegistry, CachedResult, RegistryError, SwrCacheConfig};
use chainstatus_core::{Clock, OmnichainIndexingSnapshot, StatusError};
use chainstatus_runtime::{IndexingStatusBuilder, IndexingStatusCache};

use crate::config::PublicConfig;

/// Registry key of the indexing status cache.
pub const INDEXING_STATUS_CACHE: &str = "indexing-status";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CacheRegistry>,
    pub public_config: Arc<PublicConfig>,
    pub clock: Clock,
}

impl AppState {
    pub fn new(registry: Arc<CacheRegistry>, public_config: PublicConfig) -> Self {
        Self {
            registry,
            public_config: Arc::new(public_config),
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// `Ok(None)` until a cache has been registered.
    pub fn indexing_status_cache(&self) -> Result<Option<Arc<IndexingStatusCache>>, RegistryError> {
        self.registry.get::<IndexingStatusCache>(INDEXING_STATUS_CACHE)
    }

    /// Latest cached indexing status, waiting for the first build if needed.
    ///
    /// A cache that was never registered is a wiring error, not an outage.
    pub async fn read_indexing_status(&self) -> Result<Arc<CachedStatus>, RegistryError> {
        let cache = self
            .registry
            .require::<IndexingStatusCache>(INDEXING_STATUS_CACHE)
            .map_err(|e| {
                tracing::error!(error = %e, "indexing status cache unavailable");
                e
            })?;
        Ok(cache.read().await)
    }
}

pub type CachedStatus = CachedResult<Arc<OmnichainIndexingSnapshot>, StatusError>;

/// Register the indexing status cache, or return the one already registered.
pub fn register_indexing_status_cache(
    registry: &CacheRegistry,
    builder: IndexingStatusBuilder,
    config: SwrCacheConfig,
) -> Result<Arc<IndexingStatusCache>, RegistryError> {
    registry.get_or_init(INDEXING_STATUS_CACHE, || builder.into_cache(config))
}
