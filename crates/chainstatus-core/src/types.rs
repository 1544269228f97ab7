//! Shared types for the status pipeline.

use serde::{Deserialize, Serialize};

use crate::error::StatusError;

/// Unix timestamp in seconds.
pub type UnixTimestamp = u64;

/// Current wall-clock time as a [`UnixTimestamp`].
pub fn unix_now() -> UnixTimestamp {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

/// Source of "now" for snapshot builds and projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    /// Always reports the same instant.
    Fixed(UnixTimestamp),
}

impl Clock {
    pub fn now(&self) -> UnixTimestamp {
        match self {
            Self::System => unix_now(),
            Self::Fixed(ts) => *ts,
        }
    }
}

// ─── BlockRef ─────────────────────────────────────────────────────────────────

/// A specific point in a chain's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block number.
    pub number: u64,
    /// Unix timestamp of the block (seconds since epoch).
    pub timestamp: UnixTimestamp,
}

impl BlockRef {
    pub const fn new(number: u64, timestamp: UnixTimestamp) -> Self {
        Self { number, timestamp }
    }
}

// ─── ChainId ──────────────────────────────────────────────────────────────────

/// Numeric identifier of an indexed chain (e.g. `1` for Ethereum mainnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ─── ChainIndexingConfig ──────────────────────────────────────────────────────

/// A chain indexed from `start_block` onwards, with no end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndefiniteConfig {
    pub start_block: BlockRef,
}

/// A chain indexed over the bounded range `start_block..=end_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefiniteConfig {
    pub start_block: BlockRef,
    pub end_block: BlockRef,
}

/// How a single chain is configured to be indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "configType", rename_all = "camelCase")]
pub enum ChainIndexingConfig {
    /// No end block: the chain follows realtime indefinitely.
    Indefinite(IndefiniteConfig),
    /// Bounded historical range.
    Definite(DefiniteConfig),
}

impl ChainIndexingConfig {
    /// Build a config from a start block and an optional end block.
    ///
    /// `chain` is only used to label the error.
    pub fn new(
        chain: &str,
        start_block: BlockRef,
        end_block: Option<BlockRef>,
    ) -> Result<Self, StatusError> {
        match end_block {
            None => Ok(Self::Indefinite(IndefiniteConfig { start_block })),
            Some(end_block) if end_block.number < start_block.number => {
                Err(StatusError::InvalidConfig {
                    chain: chain.to_string(),
                    reason: format!(
                        "end block {} is before start block {}",
                        end_block.number, start_block.number
                    ),
                })
            }
            Some(end_block) => Ok(Self::Definite(DefiniteConfig {
                start_block,
                end_block,
            })),
        }
    }

    pub fn start_block(&self) -> BlockRef {
        match self {
            Self::Indefinite(c) => c.start_block,
            Self::Definite(c) => c.start_block,
        }
    }

    /// `None` for indefinitely indexed chains.
    pub fn end_block(&self) -> Option<BlockRef> {
        match self {
            Self::Indefinite(_) => None,
            Self::Definite(c) => Some(c.end_block),
        }
    }

    pub fn is_definite(&self) -> bool {
        matches!(self, Self::Definite(_))
    }
}

impl From<IndefiniteConfig> for ChainIndexingConfig {
    fn from(config: IndefiniteConfig) -> Self {
        Self::Indefinite(config)
    }
}

impl From<DefiniteConfig> for ChainIndexingConfig {
    fn from(config: DefiniteConfig) -> Self {
        Self::Definite(config)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
