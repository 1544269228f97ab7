//! Status projection: renders a snapshot into the caller-facing response
//! shape as of a given "now".
//!
//! [`project`] is pure: the same snapshot and `now` always give the same
//! projection.

use serde::Serialize;

use crate::chain::{ChainIndexingStatus, ChainStatusId};
use crate::distance::{can_accelerate, worst_case_distance};
use crate::omnichain::{OmnichainConfigType, OmnichainIndexingSnapshot, OmnichainStatusId};
use crate::types::{BlockRef, ChainId, ChainIndexingConfig, UnixTimestamp};

// ─── Response shape ───────────────────────────────────────────────────────────

/// Projection of the indexing status, or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "responseCode", rename_all = "kebab-case")]
pub enum StatusProjection {
    Ok(IndexingStatusProjection),
    /// No snapshot has ever been built (e.g. the indexing runtime is
    /// unreachable).
    IndexerError {
        #[serde(rename = "projectedAt")]
        projected_at: UnixTimestamp,
    },
}

impl StatusProjection {
    pub fn is_indexer_error(&self) -> bool {
        matches!(self, Self::IndexerError { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingStatusProjection {
    /// `max(now, snapshot_time)`.
    pub projected_at: UnixTimestamp,
    pub snapshot_time: UnixTimestamp,
    pub omnichain_status: OmnichainStatusId,
    pub config_type: OmnichainConfigType,
    pub omnichain_indexing_cursor: Option<UnixTimestamp>,
    pub slowest_chain_indexing_cursor: Option<UnixTimestamp>,
    pub worst_case_distance: Option<u64>,
    /// Earliest date every chain has been indexed through.
    pub current_indexing_date: Option<UnixTimestamp>,
    pub acceleration_permitted: bool,
    /// Earliest configured start across chains; phases are laid out from here.
    pub timeline_start: UnixTimestamp,
    pub chains: Vec<ChainProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainProjection {
    pub chain_id: ChainId,
    pub status: ChainStatusId,
    pub config: ChainIndexingConfig,
    pub latest_indexed_block: Option<BlockRef>,
    pub latest_known_block: Option<BlockRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approximate_realtime_distance: Option<u64>,
    /// Share of the backfill range already indexed, `0.0..=1.0`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    pub phases: Vec<ChainPhase>,
}

/// One span of a chain's indexing timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum ChainPhase {
    /// Waiting for omnichain ordering to reach the chain's start block.
    Queued {
        from: UnixTimestamp,
        until: UnixTimestamp,
    },
    Indexing {
        from: UnixTimestamp,
        until: UnixTimestamp,
    },
    Completed { at: UnixTimestamp },
}

// ─── Projection ───────────────────────────────────────────────────────────────

/// Project `snapshot` as of `now`.
pub fn project(
    snapshot: Option<&OmnichainIndexingSnapshot>,
    now: UnixTimestamp,
) -> StatusProjection {
    let Some(snapshot) = snapshot else {
        return StatusProjection::IndexerError { projected_at: now };
    };

    let projected_at = now.max(snapshot.built_at());
    let timeline_start = snapshot
        .chains()
        .values()
        .map(|c| c.config().start_block().timestamp)
        .min()
        .unwrap_or(projected_at);

    let chains = snapshot
        .chains()
        .iter()
        .map(|(chain_id, status)| project_chain(*chain_id, status, timeline_start))
        .collect();

    StatusProjection::Ok(IndexingStatusProjection {
        projected_at,
        snapshot_time: snapshot.built_at(),
        omnichain_status: snapshot.omnichain_status().id(),
        config_type: snapshot.config_type(),
        omnichain_indexing_cursor: snapshot.omnichain_status().omnichain_indexing_cursor(),
        slowest_chain_indexing_cursor: snapshot.slowest_chain_indexing_cursor(),
        worst_case_distance: worst_case_distance(snapshot, projected_at),
        current_indexing_date: current_indexing_date(snapshot),
        acceleration_permitted: can_accelerate(Some(snapshot), projected_at),
        timeline_start,
        chains,
    })
}

/// Minimum latest-indexed timestamp across started chains. Never the
/// maximum, which would overstate progress.
fn current_indexing_date(snapshot: &OmnichainIndexingSnapshot) -> Option<UnixTimestamp> {
    snapshot
        .chains()
        .values()
        .filter_map(|c| c.latest_indexed_block())
        .map(|b| b.timestamp)
        .min()
}

fn project_chain(
    chain_id: ChainId,
    status: &ChainIndexingStatus,
    timeline_start: UnixTimestamp,
) -> ChainProjection {
    let config = status.config();
    let start = config.start_block();

    let mut phases = Vec::with_capacity(3);
    if start.timestamp > timeline_start {
        phases.push(ChainPhase::Queued {
            from: timeline_start,
            until: start.timestamp,
        });
    }
    if let Some(latest) = status.latest_indexed_block() {
        phases.push(ChainPhase::Indexing {
            from: start.timestamp,
            until: latest.timestamp,
        });
    }
    if let ChainIndexingStatus::Completed { config, .. } = status {
        phases.push(ChainPhase::Completed {
            at: config.end_block.timestamp,
        });
    }

    let (approximate_realtime_distance, progress) = match status {
        ChainIndexingStatus::Following {
            approximate_realtime_distance,
            ..
        } => (Some(*approximate_realtime_distance), None),
        ChainIndexingStatus::Backfill {
            latest_indexed_block,
            backfill_end_block,
            ..
        } => (
            None,
            Some(backfill_progress(start, *latest_indexed_block, *backfill_end_block)),
        ),
        _ => (None, None),
    };

    ChainProjection {
        chain_id,
        status: status.id(),
        config,
        latest_indexed_block: status.latest_indexed_block(),
        latest_known_block: status.latest_known_block(),
        approximate_realtime_distance,
        progress,
        phases,
    }
}

fn backfill_progress(start: BlockRef, latest: BlockRef, end: BlockRef) -> f64 {
    let total = end.number.saturating_sub(start.number);
    if total == 0 {
        return 1.0;
    }
    let done = latest.number.saturating_sub(start.number);
    (done as f64 / total as f64).clamp(0.0, 1.0)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
