//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::{QueuedSignal, SortItem, SorterStats, Transaction};
use crate::domain::errors::SorterError;

/// Primary transaction sorter API.
///
/// Shared between the shard producers and the single draining consumer;
/// every call is serialized by the implementation.
pub trait TransactionSorterApi: Send + Sync {
    /// Push one PreWrite or Commit signal.
    ///
    /// Errors are protocol violations and must stop the pipeline task.
    fn push_item(&self, item: SortItem) -> Result<(), SorterError>;

    /// Push signals in order under one lock acquisition.
    ///
    /// Stops at the first error; earlier items stay applied.
    fn push_items(&self, items: Vec<SortItem>) -> Result<(), SorterError>;

    /// Drain the committed transactions that are safe to emit, in TSO order.
    fn available_transactions(&self) -> Vec<Transaction>;

    /// Length of the arrival queue.
    fn size(&self) -> usize;

    /// Reset all state (pipeline restart).
    fn clear(&self);

    /// Snapshot of sorter state for monitoring.
    fn stats(&self) -> SorterStats;

    /// Copy of a still-registered transaction.
    fn transaction(&self, xid: &str) -> Option<Transaction>;

    /// Copy of the oldest signal in the arrival queue.
    fn peek_first_item(&self) -> Option<QueuedSignal>;
}
