//! Domain invariants for the transaction sorter.
//!
//! Pure checks over emitted batches and engine indices. The sorter asserts
//! them in debug builds after every drain.

use super::entities::Transaction;
use super::value_objects::{ReadyKey, VirtualTso, Xid};
use std::collections::{HashMap, HashSet};

/// INVARIANT-1: Emission Order
/// A batch is non-decreasing in virtual TSO, and starts no lower than the
/// last transaction emitted by a previous batch.
pub fn invariant_emission_order(previous: Option<&ReadyKey>, batch: &[Transaction]) -> bool {
    let mut last: Option<ReadyKey> = previous.cloned();

    for txn in batch {
        let Some(tso) = txn.virtual_tso() else {
            return false;
        };
        let key = ReadyKey::new(tso, txn.xid().clone());
        if let Some(prev) = &last {
            if key.virtual_tso < prev.virtual_tso {
                return false;
            }
        }
        last = Some(key);
    }

    true
}

/// INVARIANT-2: No Premature Emission
/// Nothing in a batch may exceed the watermark that released it.
pub fn invariant_within_watermark(batch: &[Transaction], watermark: Option<VirtualTso>) -> bool {
    if batch.is_empty() {
        return true;
    }
    let Some(watermark) = watermark else {
        return false;
    };

    batch
        .iter()
        .all(|txn| txn.virtual_tso().is_some_and(|tso| tso <= watermark))
}

/// INVARIANT-3: Registry Consistency
/// Every pending xid and every ready key refer to a registered transaction.
pub fn invariant_registry_consistent<'a>(
    pending: &HashSet<Xid>,
    ready: impl IntoIterator<Item = &'a ReadyKey>,
    registry: &HashMap<Xid, Transaction>,
) -> bool {
    if !pending.iter().all(|xid| registry.contains_key(xid)) {
        return false;
    }

    ready
        .into_iter()
        .all(|key| registry.contains_key(&key.xid) && !pending.contains(&key.xid))
}
