//! Core entities for the transaction sorter.

use super::value_objects::{SortItemType, VirtualTso, Xid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unit of replicated work captured from one shard.
///
/// The payload is opaque to the sorter; it only moves the transaction
/// between its internal structures and hands it back in TSO order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    xid: Xid,
    virtual_tso: Option<VirtualTso>,
    payload: Vec<u8>,
    source: Option<String>,
    released: bool,
}

impl Transaction {
    /// Create a transaction whose TSO will be assigned on commit.
    pub fn new(xid: impl Into<Xid>) -> Self {
        Self {
            xid: xid.into(),
            virtual_tso: None,
            payload: Vec::new(),
            source: None,
            released: false,
        }
    }

    pub fn with_virtual_tso(mut self, tso: impl Into<VirtualTso>) -> Self {
        self.virtual_tso = Some(tso.into());
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Storage instance (shard) the transaction was extracted from.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn xid(&self) -> &Xid {
        &self.xid
    }

    pub fn virtual_tso(&self) -> Option<VirtualTso> {
        self.virtual_tso
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn assign_virtual_tso(&mut self, tso: VirtualTso) {
        self.virtual_tso = Some(tso);
    }

    /// Drop the payload buffer. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.payload = Vec::new();
        self.released = true;
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transaction{{xid={}", self.xid)?;
        if let Some(tso) = &self.virtual_tso {
            write!(f, ", vtso={}", tso)?;
        }
        if let Some(source) = &self.source {
            write!(f, ", source={}", source)?;
        }
        write!(f, ", payload={}B}}", self.payload.len())
    }
}

pub(crate) type SortItemParts = (SortItemType, Xid, Option<Transaction>, Option<VirtualTso>);

/// A signal pushed into the sorter.
///
/// A PreWrite carries the transaction it registers. A Commit only names the
/// xid, plus the commit TSO when it was not known at prewrite time.
#[derive(Clone, Debug)]
pub struct SortItem {
    kind: SortItemType,
    xid: Xid,
    transaction: Option<Transaction>,
    commit_tso: Option<VirtualTso>,
}

impl SortItem {
    pub fn prewrite(transaction: Transaction) -> Self {
        Self {
            kind: SortItemType::PreWrite,
            xid: transaction.xid().clone(),
            transaction: Some(transaction),
            commit_tso: None,
        }
    }

    pub fn commit(xid: impl Into<Xid>, commit_tso: Option<VirtualTso>) -> Self {
        Self {
            kind: SortItemType::Commit,
            xid: xid.into(),
            transaction: None,
            commit_tso,
        }
    }

    pub fn kind(&self) -> SortItemType {
        self.kind
    }

    pub fn xid(&self) -> &Xid {
        &self.xid
    }

    pub fn commit_tso(&self) -> Option<VirtualTso> {
        self.commit_tso
    }

    pub(crate) fn into_parts(self) -> SortItemParts {
        (self.kind, self.xid, self.transaction, self.commit_tso)
    }
}

/// What the arrival queue keeps for each accepted signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedSignal {
    pub kind: SortItemType,
    pub xid: Xid,
    /// Known for commits; for prewrites only when assigned up front.
    pub virtual_tso: Option<VirtualTso>,
}

impl QueuedSignal {
    pub fn new(kind: SortItemType, xid: Xid, virtual_tso: Option<VirtualTso>) -> Self {
        Self {
            kind,
            xid,
            virtual_tso,
        }
    }
}

impl fmt::Display for QueuedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.virtual_tso {
            Some(tso) => write!(f, "{}({}, {})", self.kind, self.xid, tso),
            None => write!(f, "{}({})", self.kind, self.xid),
        }
    }
}

/// Numeric limits the drain works within.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortLimits {
    /// Arrival queue length above which a whitelisted head may be skipped
    pub skip_threshold: usize,
    /// Time budget for one arrival queue scan (milliseconds)
    pub scan_budget_ms: u64,
}

impl Default for SortLimits {
    fn default() -> Self {
        Self {
            skip_threshold: 10_000,
            scan_budget_ms: 500,
        }
    }
}

/// Point-in-time snapshot of sorter state for monitoring.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SorterStats {
    /// Signals waiting in the arrival queue.
    pub queued_items: usize,
    /// Pre-written transactions not yet committed.
    pub pending: usize,
    /// Transactions currently registered.
    pub registered: usize,
    /// Committed transactions waiting for the watermark.
    pub ready: usize,
    /// Current high watermark in canonical form.
    pub high_watermark: Option<String>,
    pub total_pushed: u64,
    pub total_emitted: u64,
    /// Pending transactions forcibly resolved by head-skip.
    pub total_skipped: u64,
    /// Whitelisted commits dropped for lack of a prewrite.
    pub total_dropped_commits: u64,
    /// Commits rejected by the admission strategy.
    pub total_discarded_commits: u64,
}
