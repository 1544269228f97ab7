//! Per-chain indexing status: the four-state lifecycle of a single chain and
//! the builder that derives it from normalized runtime facts.
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted ──▶ Backfill ──▶ Following   (indefinite config)
//!                        └──▶ Completed   (definite config)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::StatusError;
use crate::types::{
    BlockRef, ChainId, ChainIndexingConfig, DefiniteConfig, IndefiniteConfig, UnixTimestamp,
};

// ─── ChainStatusId ────────────────────────────────────────────────────────────

/// Discriminant of [`ChainIndexingStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChainStatusId {
    NotStarted,
    Backfill,
    Following,
    Completed,
}

impl std::fmt::Display for ChainStatusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Backfill => write!(f, "backfill"),
            Self::Following => write!(f, "following"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ─── ChainIndexingStatus ──────────────────────────────────────────────────────

/// Indexing status of a single chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "chainStatus", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChainIndexingStatus {
    /// Indexing has not advanced past the configured start block.
    NotStarted { config: ChainIndexingConfig },

    /// Catching up through history.
    Backfill {
        config: ChainIndexingConfig,
        latest_indexed_block: BlockRef,
        /// Furthest block known to exist at the backfill horizon.
        latest_known_block: BlockRef,
        backfill_end_block: BlockRef,
    },

    /// Near the live chain head and continuing indefinitely.
    Following {
        config: IndefiniteConfig,
        latest_indexed_block: BlockRef,
        latest_known_block: BlockRef,
        /// Seconds between "now" and `latest_indexed_block.timestamp`.
        approximate_realtime_distance: u64,
    },

    /// A bounded chain indexed through its end block.
    Completed {
        config: DefiniteConfig,
        latest_indexed_block: BlockRef,
        latest_known_block: BlockRef,
    },
}

impl ChainIndexingStatus {
    pub fn id(&self) -> ChainStatusId {
        match self {
            Self::NotStarted { .. } => ChainStatusId::NotStarted,
            Self::Backfill { .. } => ChainStatusId::Backfill,
            Self::Following { .. } => ChainStatusId::Following,
            Self::Completed { .. } => ChainStatusId::Completed,
        }
    }

    /// Position in the lifecycle. `Following` and `Completed` are both terminal
    /// and share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::NotStarted { .. } => 0,
            Self::Backfill { .. } => 1,
            Self::Following { .. } | Self::Completed { .. } => 2,
        }
    }

    pub fn config(&self) -> ChainIndexingConfig {
        match self {
            Self::NotStarted { config } | Self::Backfill { config, .. } => *config,
            Self::Following { config, .. } => (*config).into(),
            Self::Completed { config, .. } => (*config).into(),
        }
    }

    /// The most recent block whose indexed state is guaranteed correct.
    /// `None` while the chain has not started.
    pub fn latest_indexed_block(&self) -> Option<BlockRef> {
        match self {
            Self::NotStarted { .. } => None,
            Self::Backfill {
                latest_indexed_block,
                ..
            }
            | Self::Following {
                latest_indexed_block,
                ..
            }
            | Self::Completed {
                latest_indexed_block,
                ..
            } => Some(*latest_indexed_block),
        }
    }

    pub fn latest_known_block(&self) -> Option<BlockRef> {
        match self {
            Self::NotStarted { .. } => None,
            Self::Backfill {
                latest_known_block,
                ..
            }
            | Self::Following {
                latest_known_block,
                ..
            }
            | Self::Completed {
                latest_known_block,
                ..
            } => Some(*latest_known_block),
        }
    }
}

// ─── ChainFacts ───────────────────────────────────────────────────────────────

/// Normalized per-chain sync facts reported by the indexing runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFacts {
    pub chain_id: ChainId,
    pub config: ChainIndexingConfig,
    pub is_sync_complete: bool,
    pub is_sync_realtime: bool,
    pub latest_indexed_block: BlockRef,
    pub latest_known_block: BlockRef,
    pub backfill_end_block: BlockRef,
}

impl ChainFacts {
    /// Derive the chain's status. Rules are evaluated in order, first match
    /// wins:
    ///
    /// 1. indexed watermark at the start block → `NotStarted`
    /// 2. sync complete → `Completed` (definite config required)
    /// 3. sync realtime on an indefinite config → `Following`
    /// 4. otherwise → `Backfill`
    ///
    /// A watermark below the start block, or a completed sync without an end
    /// block, is an invariant violation and fails the build.
    pub fn into_status(self, now: UnixTimestamp) -> Result<ChainIndexingStatus, StatusError> {
        let start_block = self.config.start_block();
        let latest = self.latest_indexed_block;

        if latest.number < start_block.number {
            return Err(self.invariant(format!(
                "latest indexed block {} is below start block {}",
                latest.number, start_block.number
            )));
        }

        if latest.number == start_block.number {
            return Ok(ChainIndexingStatus::NotStarted {
                config: self.config,
            });
        }

        if self.is_sync_complete {
            let ChainIndexingConfig::Definite(config) = self.config else {
                return Err(self.invariant("sync reported complete but no end block is configured"));
            };
            if latest.number != config.end_block.number {
                return Err(self.invariant(format!(
                    "sync reported complete at block {} but end block is {}",
                    latest.number, config.end_block.number
                )));
            }
            return Ok(ChainIndexingStatus::Completed {
                config,
                latest_indexed_block: config.end_block,
                latest_known_block: config.end_block,
            });
        }

        // A definite chain reporting realtime is still heading to its end
        // block, so it stays in backfill until complete.
        if self.is_sync_realtime {
            if let ChainIndexingConfig::Indefinite(config) = self.config {
                return Ok(ChainIndexingStatus::Following {
                    config,
                    latest_indexed_block: latest,
                    latest_known_block: self.latest_known_block,
                    approximate_realtime_distance: now.saturating_sub(latest.timestamp),
                });
            }
        }

        Ok(ChainIndexingStatus::Backfill {
            config: self.config,
            latest_indexed_block: latest,
            latest_known_block: self.latest_known_block,
            backfill_end_block: self.backfill_end_block,
        })
    }

    fn invariant(&self, reason: impl Into<String>) -> StatusError {
        StatusError::Invariant {
            chain_id: self.chain_id,
            reason: reason.into(),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
