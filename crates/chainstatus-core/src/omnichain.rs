//! Omnichain aggregation: combines every chain's status into one
//! cross-chain status.
//!
//! Aggregation is pessimistic: the whole is only as advanced as its least
//! advanced chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chain::ChainIndexingStatus;
use crate::error::StatusError;
use crate::types::{ChainId, ChainIndexingConfig, UnixTimestamp};

// ─── OmnichainConfigType ──────────────────────────────────────────────────────

/// Classification of the full set of configured chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OmnichainConfigType {
    /// At least one chain has no end block. Can reach `Following`, never
    /// `Completed`.
    Indefinite,
    /// Every chain is bounded. Can reach `Completed`.
    Definite,
}

impl std::fmt::Display for OmnichainConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indefinite => write!(f, "indefinite"),
            Self::Definite => write!(f, "definite"),
        }
    }
}

/// Classify a set of chain configs. Depends only on configuration, never on
/// current progress.
pub fn aggregate_config_type<'a>(
    configs: impl IntoIterator<Item = &'a ChainIndexingConfig>,
) -> OmnichainConfigType {
    if configs.into_iter().all(ChainIndexingConfig::is_definite) {
        OmnichainConfigType::Definite
    } else {
        OmnichainConfigType::Indefinite
    }
}

// ─── OmnichainIndexingStatus ──────────────────────────────────────────────────

/// Discriminant of [`OmnichainIndexingStatus`], ordered from least to most
/// advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OmnichainStatusId {
    Unstarted,
    Backfill,
    Following,
    Completed,
}

impl std::fmt::Display for OmnichainStatusId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unstarted => write!(f, "unstarted"),
            Self::Backfill => write!(f, "backfill"),
            Self::Following => write!(f, "following"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Aggregated status across all chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "omnichainStatus", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OmnichainIndexingStatus {
    Unstarted,
    Backfill,
    Following {
        omnichain_indexing_cursor: UnixTimestamp,
    },
    Completed {
        omnichain_indexing_cursor: UnixTimestamp,
    },
}

impl OmnichainIndexingStatus {
    pub fn id(&self) -> OmnichainStatusId {
        match self {
            Self::Unstarted => OmnichainStatusId::Unstarted,
            Self::Backfill => OmnichainStatusId::Backfill,
            Self::Following { .. } => OmnichainStatusId::Following,
            Self::Completed { .. } => OmnichainStatusId::Completed,
        }
    }

    /// Timestamp omnichain-ordered processing has reached. Only carried once
    /// every chain is following or completed.
    pub fn omnichain_indexing_cursor(&self) -> Option<UnixTimestamp> {
        match self {
            Self::Following {
                omnichain_indexing_cursor,
            }
            | Self::Completed {
                omnichain_indexing_cursor,
            } => Some(*omnichain_indexing_cursor),
            Self::Unstarted | Self::Backfill => None,
        }
    }
}

/// Aggregate chain statuses:
///
/// - any `NotStarted` → `Unstarted`
/// - else any `Backfill` → `Backfill`
/// - else all `Completed` → `Completed`
/// - else → `Following`
///
/// Returns `None` for an empty set.
pub fn aggregate_status<'a>(
    chains: impl IntoIterator<Item = &'a ChainIndexingStatus>,
) -> Option<OmnichainIndexingStatus> {
    let chains: Vec<&ChainIndexingStatus> = chains.into_iter().collect();
    if chains.is_empty() {
        return None;
    }

    if chains
        .iter()
        .any(|c| matches!(c, ChainIndexingStatus::NotStarted { .. }))
    {
        return Some(OmnichainIndexingStatus::Unstarted);
    }
    if chains
        .iter()
        .any(|c| matches!(c, ChainIndexingStatus::Backfill { .. }))
    {
        return Some(OmnichainIndexingStatus::Backfill);
    }

    // Every chain is following or completed here, so every chain has an
    // indexed block.
    let omnichain_indexing_cursor = chains
        .iter()
        .filter_map(|c| c.latest_indexed_block())
        .map(|b| b.timestamp)
        .max()?;

    if chains
        .iter()
        .all(|c| matches!(c, ChainIndexingStatus::Completed { .. }))
    {
        Some(OmnichainIndexingStatus::Completed {
            omnichain_indexing_cursor,
        })
    } else {
        Some(OmnichainIndexingStatus::Following {
            omnichain_indexing_cursor,
        })
    }
}

/// Minimum `latest_indexed_block.timestamp` across started chains: the
/// latest timestamp guaranteed correct on every chain. `None` when no chain
/// has started.
pub fn slowest_chain_indexing_cursor<'a>(
    chains: impl IntoIterator<Item = &'a ChainIndexingStatus>,
) -> Option<UnixTimestamp> {
    chains
        .into_iter()
        .filter_map(ChainIndexingStatus::latest_indexed_block)
        .map(|b| b.timestamp)
        .min()
}

// ─── OmnichainIndexingSnapshot ────────────────────────────────────────────────

/// Point-in-time status of every indexed chain plus the aggregate.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OmnichainIndexingSnapshot {
    chains: BTreeMap<ChainId, ChainIndexingStatus>,
    omnichain_status: OmnichainIndexingStatus,
    config_type: OmnichainConfigType,
    #[serde(skip_serializing_if = "Option::is_none")]
    slowest_chain_indexing_cursor: Option<UnixTimestamp>,
    built_at: UnixTimestamp,
}

impl OmnichainIndexingSnapshot {
    /// Aggregate `chains` into a snapshot stamped with `built_at`.
    pub fn build(
        chains: BTreeMap<ChainId, ChainIndexingStatus>,
        built_at: UnixTimestamp,
    ) -> Result<Self, StatusError> {
        let omnichain_status = aggregate_status(chains.values()).ok_or(StatusError::NoChains)?;
        let configs: Vec<ChainIndexingConfig> = chains.values().map(|c| c.config()).collect();
        let config_type = aggregate_config_type(&configs);
        let slowest_chain_indexing_cursor = slowest_chain_indexing_cursor(chains.values());

        tracing::debug!(
            chains = chains.len(),
            status = %omnichain_status.id(),
            config_type = %config_type,
            slowest_cursor = ?slowest_chain_indexing_cursor,
            "omnichain snapshot aggregated"
        );

        Ok(Self {
            chains,
            omnichain_status,
            config_type,
            slowest_chain_indexing_cursor,
            built_at,
        })
    }

    pub fn chains(&self) -> &BTreeMap<ChainId, ChainIndexingStatus> {
        &self.chains
    }

    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainIndexingStatus> {
        self.chains.get(&chain_id)
    }

    pub fn omnichain_status(&self) -> OmnichainIndexingStatus {
        self.omnichain_status
    }

    pub fn config_type(&self) -> OmnichainConfigType {
        self.config_type
    }

    /// The single authoritative "accurate as of" timestamp. Label derived
    /// artifacts with this, never with wall-clock time.
    pub fn slowest_chain_indexing_cursor(&self) -> Option<UnixTimestamp> {
        self.slowest_chain_indexing_cursor
    }

    pub fn built_at(&self) -> UnixTimestamp {
        self.built_at
    }

    /// A completed definite set can never change again.
    pub fn is_immutable(&self) -> bool {
        matches!(self.omnichain_status, OmnichainIndexingStatus::Completed { .. })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
