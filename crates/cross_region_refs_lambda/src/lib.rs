//! AWS-oriented adapters and handlers for cross-region references.
//!
//! This crate owns runtime integration details (Lambda handlers, the SSM
//! Parameter Store adapter, configuration and log setup) on top of the
//! contracts and fan-out limiter in `cross_region_refs_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
