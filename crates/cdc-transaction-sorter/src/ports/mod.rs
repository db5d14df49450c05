//! Ports module for the transaction sorter
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::TransactionSorterApi;
pub use outbound::{CommitAdmission, SkipPolicy, SystemTimeSource, TimeSource, Timestamp};
