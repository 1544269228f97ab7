//! # chainstatus-observability
//!
//! Structured logging for ChainStatus, text or JSON, with log levels
//! configurable per component.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, LogConfig, ObservabilityError};
