//! Shared cross-region reference primitives.
//!
//! This crate owns the custom-resource request/response contracts, the
//! strong-reference tag rules, and the bounded fan-out limiter. It
//! intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod diff;
pub mod limiter;
pub mod tags;
