//! Snapshot builder: fetches facts from an [`IndexingRuntime`] and turns them
//! into an [`OmnichainIndexingSnapshot`]. Plugs into [`SwrCache`] as its
//! revalidation source.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use chainstatus_cache::{CachedResult, Revalidate, SwrCache, SwrCacheConfig};
use chainstatus_core::{Clock, OmnichainIndexingSnapshot, StatusError, UnixTimestamp};

use crate::client::IndexingRuntime;
use crate::facts::RuntimeIndexingFacts;

/// Cache of the latest indexing status snapshot.
pub type IndexingStatusCache = SwrCache<IndexingStatusBuilder>;

/// Build a snapshot from one fetch of runtime facts.
pub fn build_snapshot(
    facts: RuntimeIndexingFacts,
    now: UnixTimestamp,
) -> Result<OmnichainIndexingSnapshot, StatusError> {
    let statuses = facts
        .into_chain_facts()?
        .into_iter()
        .map(|(chain_id, facts)| facts.into_status(now).map(|status| (chain_id, status)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    OmnichainIndexingSnapshot::build(statuses, now)
}

pub struct IndexingStatusBuilder {
    runtime: Arc<dyn IndexingRuntime>,
    clock: Clock,
}

impl IndexingStatusBuilder {
    pub fn new(runtime: Arc<dyn IndexingRuntime>) -> Self {
        Self {
            runtime,
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Wrap the builder in a cache.
    pub fn into_cache(self, config: SwrCacheConfig) -> IndexingStatusCache {
        SwrCache::new(self, config)
    }

    pub async fn build(&self) -> Result<OmnichainIndexingSnapshot, StatusError> {
        let now = self.clock.now();
        let facts = self.runtime.fetch_facts().await?;
        build_snapshot(facts, now)
    }
}

#[async_trait]
impl Revalidate for IndexingStatusBuilder {
    type Output = Arc<OmnichainIndexingSnapshot>;
    type Error = StatusError;

    async fn revalidate(
        &self,
        previous: Option<&CachedResult<Self::Output, Self::Error>>,
    ) -> Result<Self::Output, Self::Error> {
        let previous = previous.and_then(CachedResult::value);

        // A completed snapshot can never change, so there is nothing to fetch.
        if let Some(prev) = previous.filter(|p| p.is_immutable()) {
            tracing::debug!(built_at = prev.built_at(), "snapshot is final, skipping fetch");
            return Ok(Arc::clone(prev));
        }

        let snapshot = match self.build().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, url = self.runtime.url(), "snapshot build failed");
                return Err(e);
            }
        };

        if let Some(prev) = previous {
            log_regressions(prev, &snapshot);
        }

        tracing::info!(
            status = %snapshot.omnichain_status().id(),
            chains = snapshot.chains().len(),
            slowest_cursor = ?snapshot.slowest_chain_indexing_cursor(),
            built_at = snapshot.built_at(),
            "indexing status snapshot built"
        );
        Ok(Arc::new(snapshot))
    }
}

/// Warn about anything that moved backwards since `prev`. The new snapshot
/// is kept regardless.
fn log_regressions(prev: &OmnichainIndexingSnapshot, next: &OmnichainIndexingSnapshot) {
    if next.omnichain_status().id() < prev.omnichain_status().id() {
        tracing::warn!(
            from = %prev.omnichain_status().id(),
            to = %next.omnichain_status().id(),
            "omnichain status regressed"
        );
    }
    for (chain_id, status) in next.chains() {
        let Some(before) = prev.chain(*chain_id) else {
            continue;
        };
        let indexed_went_back = matches!(
            (before.latest_indexed_block(), status.latest_indexed_block()),
            (Some(b), Some(a)) if a.number < b.number
        );
        if status.rank() < before.rank() || indexed_went_back {
            tracing::warn!(
                chain_id = chain_id.0,
                from = %before.id(),
                to = %status.id(),
                "chain status regressed"
            );
        }
    }
}
