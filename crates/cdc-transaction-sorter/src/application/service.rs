//! Sorting Service
//!
//! Main service implementing `TransactionSorterApi`.
//!
//! One `Sorter` per merged stream, guarded by a single lock. Shard producers
//! push through the service from their own threads; one consumer loop drains.

use super::builder::SorterBuilder;
use crate::config::SorterConfig;
use crate::domain::entities::{QueuedSignal, SortItem, SorterStats, Transaction};
use crate::domain::errors::SorterError;
use crate::domain::sorter::Sorter;
use crate::ports::inbound::TransactionSorterApi;
use parking_lot::Mutex;
use tracing::{error, info};

/// Sorting Service
///
/// Serializes every call on one mutex, so a commit can never be observed
/// before its prewrite is fully registered.
pub struct SortingService {
    sorter: Mutex<Sorter>,
}

impl SortingService {
    /// Create a new service with default config
    pub fn new() -> Self {
        Self::from_sorter(SorterBuilder::default().build())
    }

    /// Create a new service with custom config
    pub fn with_config(config: SorterConfig) -> Result<Self, SorterError> {
        Ok(Self::from_sorter(SorterBuilder::new(config).try_build()?))
    }

    /// Wrap a sorter built with custom adapters.
    pub fn from_sorter(sorter: Sorter) -> Self {
        info!(limits = ?sorter.limits(), "Sorting service started");
        Self {
            sorter: Mutex::new(sorter),
        }
    }

    /// Run a closure with exclusive access to the sorter.
    pub fn with_sorter<R>(&self, f: impl FnOnce(&mut Sorter) -> R) -> R {
        f(&mut *self.sorter.lock())
    }

    /// Hands over transactions released by head-skip.
    pub fn take_skipped(&self) -> Vec<Transaction> {
        self.sorter.lock().take_skipped()
    }
}

impl Default for SortingService {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionSorterApi for SortingService {
    fn push_item(&self, item: SortItem) -> Result<(), SorterError> {
        let xid = item.xid().clone();
        self.sorter.lock().push_item(item).map_err(|e| {
            error!(%xid, error = %e, "Sort item rejected, stream is corrupt");
            e
        })
    }

    fn push_items(&self, items: Vec<SortItem>) -> Result<(), SorterError> {
        let mut sorter = self.sorter.lock();
        for item in items {
            let xid = item.xid().clone();
            if let Err(e) = sorter.push_item(item) {
                error!(%xid, error = %e, "Sort item rejected, stream is corrupt");
                return Err(e);
            }
        }
        Ok(())
    }

    fn available_transactions(&self) -> Vec<Transaction> {
        self.sorter.lock().available_transactions()
    }

    fn size(&self) -> usize {
        self.sorter.lock().size()
    }

    fn clear(&self) {
        self.sorter.lock().clear();
    }

    fn stats(&self) -> SorterStats {
        self.sorter.lock().stats()
    }

    fn transaction(&self, xid: &str) -> Option<Transaction> {
        self.sorter.lock().transaction(xid).cloned()
    }

    fn peek_first_item(&self) -> Option<QueuedSignal> {
        self.sorter.lock().peek_first_item().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{SortItemType, VirtualTso};
    use std::sync::Arc;

    fn prewrite(xid: &str, tso: u64) -> SortItem {
        SortItem::prewrite(Transaction::new(xid).with_virtual_tso(tso))
    }

    #[test]
    fn test_push_and_drain() {
        let service = SortingService::new();

        service.push_item(prewrite("A", 10)).unwrap();
        let registered = service.transaction("A").unwrap();
        assert_eq!(registered.virtual_tso(), Some(VirtualTso::from(10)));
        assert_eq!(service.peek_first_item().unwrap().kind, SortItemType::PreWrite);

        service.push_item(SortItem::commit("A", None)).unwrap();
        let batch = service.available_transactions();

        assert_eq!(batch.len(), 1);
        assert_eq!(service.size(), 0);
        assert!(service.transaction("A").is_none());
    }

    #[test]
    fn test_push_items_stops_at_first_error() {
        let service = SortingService::new();

        let result = service.push_items(vec![
            prewrite("A", 1),
            SortItem::commit("Z", None),
            prewrite("B", 2),
        ]);

        assert!(matches!(result, Err(SorterError::UnmatchedCommit { .. })));
        assert_eq!(service.size(), 1);
        assert!(service.transaction("B").is_none());
    }

    #[test]
    fn test_reject_invalid_config() {
        let config = SorterConfig {
            discard_commit_percent: 200,
            ..Default::default()
        };
        assert!(SortingService::with_config(config).is_err());
    }

    #[test]
    fn test_clear() {
        let service = SortingService::new();
        service.push_item(prewrite("A", 1)).unwrap();

        service.clear();

        assert_eq!(service.size(), 0);
        assert_eq!(service.stats(), SorterStats::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_shard_producers() {
        let service = Arc::new(SortingService::new());
        let shards = 4u64;
        let per_shard = 50u64;

        let mut handles = Vec::new();
        for shard in 0..shards {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..per_shard {
                    let xid = format!("shard{}-{}", shard, i);
                    let tso = i * shards + shard;
                    service
                        .push_items(vec![
                            SortItem::prewrite(
                                Transaction::new(xid.as_str()).with_source(format!("dn-{}", shard)),
                            ),
                            SortItem::commit(xid.as_str(), Some(VirtualTso::from(tso))),
                        ])
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let batch = service.available_transactions();

        assert_eq!(batch.len(), (shards * per_shard) as usize);
        assert!(batch
            .windows(2)
            .all(|w| w[0].virtual_tso() <= w[1].virtual_tso()));
        assert_eq!(service.stats().total_emitted, shards * per_shard);
    }
}
