//! # Sorter - Cross-Shard Merge by Virtual TSO
//!
//! Accepts PreWrite/Commit signals from shard extractors in arrival order and
//! releases committed transactions in global virtual-TSO order.
//!
//! ## Data Structures
//!
//! - `pending`: xids pre-written but not yet committed
//! - `registry`: O(1) lookup by xid, from prewrite until emission or skip
//! - `arrival_queue`: FIFO of accepted signals (ring buffer)
//! - `ready_heap`: O(log n) min-heap of committed transactions by TSO
//! - `high_watermark`: highest commit TSO confirmed by the last scan
//!
//! ## Drain
//!
//! ```text
//!  arrival:  P1 P2 C1 P3 C2 C3
//!            └─ scan pops resolved signals, raising the watermark on
//!               every commit, and stops at the first still-pending P
//!  ready:    pop while min tso <= watermark
//! ```
//!
//! A commit that has not been scanned yet never raises the watermark, so a
//! transaction committed on a fast shard cannot overtake an older one still
//! resolving on a slow shard.

use super::entities::{QueuedSignal, SortItem, SortLimits, SorterStats, Transaction};
use super::errors::SorterError;
use super::invariants::{
    invariant_emission_order, invariant_registry_consistent, invariant_within_watermark,
};
use super::value_objects::{ReadyKey, SortItemType, VirtualTso, Xid};
use crate::ports::outbound::{CommitAdmission, SkipPolicy, TimeSource};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tracing target for skipped transactions, kept apart for operator audits.
pub const SKIP_TRANS_LOG: &str = "skip_trans_log";

/// Ordering engine for one merged binlog stream.
///
/// Not internally synchronized: every mutating call takes `&mut self`.
/// Use `SortingService` to share a sorter between threads.
///
/// INVARIANTS:
/// - A xid is registered at most once
/// - A commit needs a registered (or whitelisted) xid
/// - Emission never exceeds the high watermark
/// - Emission is non-decreasing in virtual TSO within a batch
pub struct Sorter {
    limits: SortLimits,
    skip_policy: Arc<dyn SkipPolicy>,
    admission: Box<dyn CommitAdmission>,
    time_source: Arc<dyn TimeSource>,

    pending: HashSet<Xid>,
    registry: HashMap<Xid, Transaction>,
    arrival_queue: VecDeque<QueuedSignal>,
    ready_heap: BinaryHeap<Reverse<ReadyKey>>,
    high_watermark: Option<VirtualTso>,

    first_received: Option<QueuedSignal>,
    last_emitted: Option<ReadyKey>,
    skipped: Vec<Transaction>,
    stats: SorterStats,
}

impl Sorter {
    /// Creates an empty sorter over the given policies.
    ///
    /// Use `SorterBuilder` to wire the policies from a `SorterConfig`.
    pub fn new(
        limits: SortLimits,
        skip_policy: Arc<dyn SkipPolicy>,
        admission: Box<dyn CommitAdmission>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            limits,
            skip_policy,
            admission,
            time_source,
            pending: HashSet::new(),
            registry: HashMap::new(),
            arrival_queue: VecDeque::new(),
            ready_heap: BinaryHeap::new(),
            high_watermark: None,
            first_received: None,
            last_emitted: None,
            skipped: Vec::new(),
            stats: SorterStats::default(),
        }
    }

    pub fn limits(&self) -> &SortLimits {
        &self.limits
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Accepts one signal.
    ///
    /// # Errors
    /// - `DuplicatePreWrite` if the xid is still registered
    /// - `UnmatchedCommit` if a commit has no prewrite and is not whitelisted
    /// - `DuplicateCommit` if the xid was already committed
    /// - `MissingVirtualTso` if the committed transaction has no TSO
    ///
    /// On error the engine state is left as it was.
    pub fn push_item(&mut self, item: SortItem) -> Result<(), SorterError> {
        let (kind, xid, transaction, commit_tso) = item.into_parts();

        let first = self.first_received.is_none().then(|| {
            let tso = commit_tso.or_else(|| transaction.as_ref().and_then(|t| t.virtual_tso()));
            QueuedSignal::new(kind, xid.clone(), tso)
        });

        let queued = match kind {
            SortItemType::PreWrite => {
                let transaction = transaction.unwrap_or_else(|| Transaction::new(xid.clone()));
                Some(self.register(xid, transaction)?)
            }
            SortItemType::Commit => self.resolve(xid, commit_tso)?,
        };

        if let Some(first) = first {
            info!(item = %first, "First received sort item");
            self.first_received = Some(first);
        }
        if let Some(queued) = queued {
            self.arrival_queue.push_back(queued);
            self.stats.total_pushed += 1;
        }
        Ok(())
    }

    fn register(
        &mut self,
        xid: Xid,
        transaction: Transaction,
    ) -> Result<QueuedSignal, SorterError> {
        if self.registry.contains_key(&xid) {
            return Err(SorterError::DuplicatePreWrite {
                xid: xid.to_string(),
            });
        }

        let queued = QueuedSignal::new(
            SortItemType::PreWrite,
            xid.clone(),
            transaction.virtual_tso(),
        );
        self.pending.insert(xid.clone());
        self.registry.insert(xid, transaction);
        Ok(queued)
    }

    /// Moves a pending transaction to the ready heap.
    ///
    /// Returns `None` when the commit is dropped without error.
    fn resolve(
        &mut self,
        xid: Xid,
        commit_tso: Option<VirtualTso>,
    ) -> Result<Option<QueuedSignal>, SorterError> {
        if !self.admission.admit(&xid) {
            self.stats.total_discarded_commits += 1;
            return Ok(None);
        }

        let Some(transaction) = self.registry.get_mut(&xid) else {
            if self.skip_policy.should_skip(xid.as_str()) {
                info!(target: SKIP_TRANS_LOG, %xid, "skip commit without prewrite");
                self.stats.total_dropped_commits += 1;
                return Ok(None);
            }
            return Err(SorterError::UnmatchedCommit {
                xid: xid.to_string(),
            });
        };

        if !self.pending.contains(&xid) {
            return Err(SorterError::DuplicateCommit {
                xid: xid.to_string(),
            });
        }

        let Some(tso) = commit_tso.or_else(|| transaction.virtual_tso()) else {
            return Err(SorterError::MissingVirtualTso {
                xid: xid.to_string(),
            });
        };
        transaction.assign_virtual_tso(tso);

        self.pending.remove(&xid);
        self.ready_heap.push(Reverse(ReadyKey::new(tso, xid.clone())));
        Ok(Some(QueuedSignal::new(SortItemType::Commit, xid, Some(tso))))
    }

    // =========================================================================
    // DRAIN
    // =========================================================================

    /// Returns every committed transaction that is safe to emit, in TSO order.
    ///
    /// Once a scan has consumed every resolved signal at the queue head, a
    /// second call with no push in between returns nothing. A scan cut short
    /// by the budget leaves work behind, so the next call may emit more.
    pub fn available_transactions(&mut self) -> Vec<Transaction> {
        let mut result = Vec::new();
        if self.arrival_queue.is_empty() {
            return result;
        }

        if self.arrival_queue.len() > self.limits.skip_threshold {
            self.skip_stuck_head();
        }

        self.scan_arrival_queue();

        while let Some(Reverse(key)) = self.ready_heap.peek() {
            let releasable = self
                .high_watermark
                .is_some_and(|watermark| key.virtual_tso <= watermark);
            if !releasable {
                break;
            }
            let Some(Reverse(key)) = self.ready_heap.pop() else {
                break;
            };
            match self.registry.remove(&key.xid) {
                Some(transaction) => {
                    debug!(%transaction, "Transaction released");
                    result.push(transaction);
                }
                None => warn!(xid = %key.xid, "Ready transaction missing from registry"),
            }
        }

        debug_assert!(invariant_emission_order(None, &result));
        debug_assert!(invariant_within_watermark(&result, self.high_watermark));
        debug_assert!(invariant_registry_consistent(
            &self.pending,
            self.ready_heap.iter().map(|Reverse(key)| key),
            &self.registry,
        ));

        if !invariant_emission_order(self.last_emitted.as_ref(), &result) {
            warn!(
                last_emitted = ?self.last_emitted,
                "Virtual tso regressed across batches, upstream tso allocation is not causal"
            );
        }

        if let Some(last) = result.last() {
            if let Some(tso) = last.virtual_tso() {
                self.last_emitted = Some(ReadyKey::new(tso, last.xid().clone()));
            }
            self.stats.total_emitted += result.len() as u64;
            debug!(count = result.len(), "Available transactions drained");
        }

        result
    }

    /// Forcibly resolves a whitelisted prewrite stuck at the queue head.
    ///
    /// Only the head is inspected. A head xid that already committed is left
    /// to drain normally.
    fn skip_stuck_head(&mut self) {
        let Some(head) = self.arrival_queue.front() else {
            return;
        };
        if head.kind != SortItemType::PreWrite || !self.skip_policy.should_skip(head.xid.as_str()) {
            return;
        }

        let xid = head.xid.clone();
        info!(%xid, "hit the whitelist, skip transaction");
        info!(target: SKIP_TRANS_LOG, %xid, "skip");

        if self.pending.remove(&xid) {
            if let Some(mut transaction) = self.registry.remove(&xid) {
                transaction.release();
                self.skipped.push(transaction);
            }
            self.stats.total_skipped += 1;
        }
    }

    /// Pops resolved signals from the head, raising the watermark on commits.
    ///
    /// Stops at a still-pending prewrite or when the scan budget runs out.
    fn scan_arrival_queue(&mut self) {
        let started = self.time_source.now();

        while let Some(head) = self.arrival_queue.front() {
            match head.kind {
                SortItemType::PreWrite => {
                    if self.pending.contains(&head.xid) {
                        debug!(xid = %head.xid, "Transaction is not ready");
                        break;
                    }
                }
                SortItemType::Commit => {
                    if let Some(tso) = head.virtual_tso {
                        if self.high_watermark.map_or(true, |watermark| tso > watermark) {
                            self.high_watermark = Some(tso);
                        }
                    }
                }
            }
            self.arrival_queue.pop_front();

            let elapsed = self.time_source.now().saturating_sub(started);
            if elapsed > self.limits.scan_budget_ms {
                debug!(
                    elapsed_ms = elapsed,
                    remaining = self.arrival_queue.len(),
                    "Scan budget exhausted"
                );
                break;
            }
        }
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    /// Length of the arrival queue.
    pub fn size(&self) -> usize {
        self.arrival_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrival_queue.is_empty()
    }

    /// Gets a transaction that is still registered.
    pub fn transaction(&self, xid: &str) -> Option<&Transaction> {
        self.registry.get(xid)
    }

    pub fn peek_first_item(&self) -> Option<&QueuedSignal> {
        self.arrival_queue.front()
    }

    /// Lowest committed transaction waiting for the watermark.
    pub fn peek_ready(&self) -> Option<&ReadyKey> {
        self.ready_heap.peek().map(|Reverse(key)| key)
    }

    /// All registered transactions, pending or committed.
    pub fn queued_transactions(&self) -> Vec<&Transaction> {
        self.registry.values().collect()
    }

    pub fn high_watermark(&self) -> Option<VirtualTso> {
        self.high_watermark
    }

    pub fn first_received(&self) -> Option<&QueuedSignal> {
        self.first_received.as_ref()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Hands over the transactions released by head-skip since the last call.
    pub fn take_skipped(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.skipped)
    }

    pub fn stats(&self) -> SorterStats {
        SorterStats {
            queued_items: self.arrival_queue.len(),
            pending: self.pending.len(),
            registered: self.registry.len(),
            ready: self.ready_heap.len(),
            high_watermark: self.high_watermark.map(|tso| tso.to_string()),
            ..self.stats.clone()
        }
    }

    /// Drops all state, as on a pipeline restart.
    pub fn clear(&mut self) {
        info!(
            queued_items = self.arrival_queue.len(),
            registered = self.registry.len(),
            "Clearing sorter"
        );
        self.pending.clear();
        self.registry.clear();
        self.arrival_queue.clear();
        self.ready_heap.clear();
        self.high_watermark = None;
        self.first_received = None;
        self.last_emitted = None;
        self.skipped.clear();
        self.stats = SorterStats::default();
    }
}

impl std::fmt::Debug for Sorter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sorter")
            .field("limits", &self.limits)
            .field("queued_items", &self.arrival_queue.len())
            .field("pending", &self.pending.len())
            .field("registered", &self.registry.len())
            .field("ready", &self.ready_heap.len())
            .field("high_watermark", &self.high_watermark)
            .finish()
    }
}
