//! Value objects for the transaction sorter.
//!
//! Identifiers, the virtual TSO ordering key and the signal kinds pushed
//! by shard extractors.

use super::errors::SorterError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Width of the physical tso part in the canonical textual form.
const TSO_WIDTH: usize = 19;
/// Width of the transaction id part in the canonical textual form.
const TRANSACTION_ID_WIDTH: usize = 19;
/// Width of the sequence part in the canonical textual form.
const SEQ_WIDTH: usize = 10;
/// Total length of a canonical virtual TSO string.
pub const VIRTUAL_TSO_LEN: usize = TSO_WIDTH + TRANSACTION_ID_WIDTH + SEQ_WIDTH;

/// Global identifier of a two-phase-commit transaction branch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Xid(String);

impl Xid {
    pub fn new(xid: impl Into<String>) -> Self {
        Self(xid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Xid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Xid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for Xid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Cross-shard commit timestamp used as the global ordering key.
///
/// Compared by `tso`, then `transaction_id`, then `seq`. The canonical
/// textual form pads each part with zeros so lexical and numeric order agree:
///
/// ```text
/// 0000000000000000010 0000000000000000007 0000000001
/// └────── tso ──────┘ └─ transaction_id ─┘ └─ seq ──┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VirtualTso {
    pub tso: u64,
    pub transaction_id: u64,
    pub seq: u32,
}

impl VirtualTso {
    pub fn new(tso: u64, transaction_id: u64, seq: u32) -> Self {
        Self {
            tso,
            transaction_id,
            seq,
        }
    }
}

impl From<u64> for VirtualTso {
    fn from(tso: u64) -> Self {
        Self::new(tso, 0, 0)
    }
}

impl fmt::Display for VirtualTso {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0tw$}{:0iw$}{:0sw$}",
            self.tso,
            self.transaction_id,
            self.seq,
            tw = TSO_WIDTH,
            iw = TRANSACTION_ID_WIDTH,
            sw = SEQ_WIDTH
        )
    }
}

impl FromStr for VirtualTso {
    type Err = SorterError;

    /// Accepts the 48-digit canonical form, or a bare number taken as a plain tso.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SorterError::InvalidVirtualTso(s.to_string());

        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        if s.len() != VIRTUAL_TSO_LEN {
            return s.parse::<u64>().map(Self::from).map_err(|_| invalid());
        }

        let (tso, rest) = s.split_at(TSO_WIDTH);
        let (transaction_id, seq) = rest.split_at(TRANSACTION_ID_WIDTH);
        Ok(Self {
            tso: tso.parse().map_err(|_| invalid())?,
            transaction_id: transaction_id.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

/// Kind of signal emitted by a shard extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortItemType {
    /// Transaction prepared on a shard, not yet committed.
    PreWrite,
    /// Transaction finalized and eligible for global ordering.
    Commit,
}

impl fmt::Display for SortItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreWrite => f.write_str("PreWrite"),
            Self::Commit => f.write_str("Commit"),
        }
    }
}

/// Key of a committed transaction waiting in the ready heap.
///
/// Lower TSO sorts first. Equal TSOs fall back to xid order so emission
/// stays deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyKey {
    pub virtual_tso: VirtualTso,
    pub xid: Xid,
}

impl ReadyKey {
    pub fn new(virtual_tso: VirtualTso, xid: Xid) -> Self {
        Self { virtual_tso, xid }
    }
}

impl Ord for ReadyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.virtual_tso
            .cmp(&other.virtual_tso)
            .then_with(|| self.xid.cmp(&other.xid))
    }
}

impl PartialOrd for ReadyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    #[test]
    fn test_virtual_tso_orders_by_parts() {
        let a = VirtualTso::new(10, 5, 0);
        let b = VirtualTso::new(10, 6, 0);
        let c = VirtualTso::new(11, 0, 0);

        assert!(a < b);
        assert!(b < c);
        assert!(VirtualTso::new(10, 5, 1) > a);
    }

    #[test]
    fn test_virtual_tso_canonical_form() {
        let tso = VirtualTso::new(7026466735442395200, 1412, 3);
        let text = tso.to_string();

        assert_eq!(text.len(), VIRTUAL_TSO_LEN);
        assert_eq!(text, "702646673544239520000000000000000014120000000003");
        assert_eq!(text.parse::<VirtualTso>().unwrap(), tso);
    }

    #[test]
    fn test_lexical_order_matches_numeric_order() {
        let low = VirtualTso::new(9, 99, 9).to_string();
        let high = VirtualTso::new(10, 0, 0).to_string();

        assert!(low < high);
    }

    #[test]
    fn test_parse_bare_number() {
        assert_eq!("42".parse::<VirtualTso>().unwrap(), VirtualTso::from(42));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("12ab".parse::<VirtualTso>(), Err(SorterError::InvalidVirtualTso(_))));
        assert!("".parse::<VirtualTso>().is_err());
    }

    #[test]
    fn test_ready_key_breaks_ties_by_xid() {
        let mut heap = BinaryHeap::new();
        heap.push(Reverse(ReadyKey::new(VirtualTso::from(5), Xid::from("b"))));
        heap.push(Reverse(ReadyKey::new(VirtualTso::from(5), Xid::from("a"))));
        heap.push(Reverse(ReadyKey::new(VirtualTso::from(3), Xid::from("z"))));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|Reverse(k)| k.xid)).collect();
        assert_eq!(order, vec![Xid::from("z"), Xid::from("a"), Xid::from("b")]);
    }
}
