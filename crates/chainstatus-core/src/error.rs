//! Error types for the status pipeline.

use thiserror::Error;

use crate::types::ChainId;

/// Errors that can occur while building or evaluating indexing status.
///
/// `Clone` so a failed build can be stored in a cache and handed to many
/// readers at once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("chain '{chain}' is missing from {map}")]
    MissingChain { chain: String, map: &'static str },

    #[error("chain id {chain_id} is reported by both '{first}' and '{second}'")]
    DuplicateChainId {
        chain_id: ChainId,
        first: String,
        second: String,
    },

    #[error("unsupported event ordering '{0}', expected 'omnichain'")]
    UnsupportedOrdering(String),

    #[error("invalid indexing config for chain '{chain}': {reason}")]
    InvalidConfig { chain: String, reason: String },

    #[error("invariant violated for chain {chain_id}: {reason}")]
    Invariant { chain_id: ChainId, reason: String },

    #[error("no chains are configured for indexing")]
    NoChains,

    #[error("indexing runtime unavailable: {0}")]
    Runtime(String),

    #[error("failed to decode indexing runtime response: {0}")]
    Decode(String),

    #[error("invalid max worst-case distance '{raw}': {reason}")]
    InvalidDistance { raw: String, reason: String },
}

impl StatusError {
    /// Returns `true` if waiting and rebuilding may clear the error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Runtime(_) | Self::Decode(_))
    }

    /// Returns `true` if the error was caused by caller input rather than
    /// by the indexing runtime.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidDistance { .. })
    }
}
