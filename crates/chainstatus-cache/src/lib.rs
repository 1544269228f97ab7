//! chainstatus-cache: stale-while-revalidate caching for expensive snapshots.
//!
//! ```text
//! CacheRegistry ("indexing-status" → SwrCache<R>)
//!                                        ├── watch slot   (latest CachedResult)
//!                                        ├── in-flight    (single-flight flag)
//!                                        └── scheduler    (optional interval task)
//! ```

pub mod registry;
pub mod swr;

pub use registry::{CacheRegistry, RegistryError};
pub use swr::{from_fn, CachedResult, FnRevalidator, Revalidate, SwrCache, SwrCacheConfig};
