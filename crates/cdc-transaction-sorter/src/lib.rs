//! # Cross-Shard Transaction Sorter
//!
//! Merges PreWrite/Commit signals captured from many physical binlog shards
//! into one stream of committed transactions in global virtual-TSO order.
//!
//! ## Architecture
//!
//! - **Domain**: `Sorter` state machine, `Transaction`, `SortItem`, `VirtualTso`
//! - **Ports**: Inbound (`TransactionSorterApi`) and Outbound (`SkipPolicy`,
//!   `CommitAdmission`, `TimeSource`)
//! - **Adapters**: whitelist skip policy, admit-all and random-discard admission
//! - **Application**: `SorterBuilder` (config to adapters) and `SortingService`,
//!   the thread-safe façade
//!
//! ## Usage
//!
//! ```rust
//! use cdc_transaction_sorter::{SortItem, SorterBuilder, Transaction, VirtualTso};
//!
//! let mut sorter = SorterBuilder::default().build();
//! sorter.push_item(SortItem::prewrite(Transaction::new("A").with_virtual_tso(10u64)))?;
//! sorter.push_item(SortItem::prewrite(Transaction::new("B").with_virtual_tso(5u64)))?;
//! sorter.push_item(SortItem::commit("B", None))?;
//! sorter.push_item(SortItem::commit("A", None))?;
//!
//! let batch = sorter.available_transactions();
//! assert_eq!(batch[0].virtual_tso(), Some(VirtualTso::from(5)));
//! # Ok::<(), cdc_transaction_sorter::SorterError>(())
//! ```
//!
//! ## Error Policy
//!
//! Every `SorterError` raised by `push_item` is a protocol violation: the
//! upstream stream is corrupt and the pipeline task must stop.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{AdmitAll, NeverSkip, RandomDiscard, WhitelistSkipPolicy};
pub use application::{SorterBuilder, SortingService};
pub use config::SorterConfig;
pub use domain::entities::*;
pub use domain::errors::SorterError;
pub use domain::sorter::{Sorter, SKIP_TRANS_LOG};
pub use domain::value_objects::*;
pub use ports::inbound::TransactionSorterApi;
pub use ports::outbound::{CommitAdmission, SkipPolicy, SystemTimeSource, TimeSource, Timestamp};
