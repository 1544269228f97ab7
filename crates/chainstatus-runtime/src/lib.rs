//! chainstatus-runtime: talks to the indexing runtime and builds snapshots.
//!
//! ```text
//! IndexingRuntime (HTTP / memory) ──RuntimeIndexingFacts──▶ into_chain_facts
//!                                                              │
//!                                   IndexingStatusBuilder ◀────┘
//!                                              │ (Revalidate)
//!                                     IndexingStatusCache
//! ```

pub mod builder;
pub mod client;
pub mod facts;

pub use builder::{build_snapshot, IndexingStatusBuilder, IndexingStatusCache};
pub use client::{HttpIndexingRuntime, HttpRuntimeConfig, IndexingRuntime, MemoryIndexingRuntime};
pub use facts::{
    AppSettings, BlockRangeConfig, ChainBlockRefs, ChainMetrics, ChainSyncStatus,
    RuntimeIndexingFacts, OMNICHAIN_ORDERING,
};
