//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: skip policies and commit admission
//! strategies.

mod admission;
mod skip_policy;

pub use admission::{AdmitAll, RandomDiscard};
pub use skip_policy::{NeverSkip, WhitelistSkipPolicy};
