//! chainstatus-core: indexing status model for an omnichain indexer.
//!
//! # Architecture
//!
//! ```text
//! ChainFacts (per chain) ──into_status──▶ ChainIndexingStatus
//!                                              │
//!                     OmnichainIndexingSnapshot::build
//!                                              │
//!                 ┌────────────────────────────┼───────────────────┐
//!                 ▼                            ▼                   ▼
//!          distance::check_realtime    distance::can_accelerate   projection::project
//! ```
//!
//! Everything here is pure and synchronous. Fetching facts, caching
//! snapshots and serving them over HTTP live in sibling crates.

pub mod chain;
pub mod distance;
pub mod error;
pub mod omnichain;
pub mod projection;
pub mod types;

pub use chain::{ChainFacts, ChainIndexingStatus, ChainStatusId};
pub use distance::{
    can_accelerate, check_realtime, worst_case_distance, MaxWorstCaseDistance, RealtimeCheck,
    RealtimeOutcome, ACCELERATION_MAX_WORST_CASE_DISTANCE,
};
pub use error::StatusError;
pub use omnichain::{
    OmnichainConfigType, OmnichainIndexingSnapshot, OmnichainIndexingStatus, OmnichainStatusId,
};
pub use projection::{project, ChainPhase, ChainProjection, IndexingStatusProjection, StatusProjection};
pub use types::{
    unix_now, BlockRef, ChainId, ChainIndexingConfig, Clock, DefiniteConfig, IndefiniteConfig,
    UnixTimestamp,
};
