//! Commit Admission Adapters
//!
//! `AdmitAll` is what production runs. `RandomDiscard` drops a share of
//! commit signals so that stuck-transaction handling can be exercised.

use crate::domain::value_objects::Xid;
use crate::ports::outbound::CommitAdmission;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

/// Admits every commit.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmitAll;

impl CommitAdmission for AdmitAll {
    fn admit(&mut self, _xid: &Xid) -> bool {
        true
    }
}

/// Drops each commit with a fixed probability.
#[derive(Debug)]
pub struct RandomDiscard {
    percent: u8,
    rng: StdRng,
}

impl RandomDiscard {
    pub fn new(percent: u8) -> Self {
        Self {
            percent: percent.min(100),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for reproducible test runs.
    pub fn with_seed(percent: u8, seed: u64) -> Self {
        Self {
            percent: percent.min(100),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl CommitAdmission for RandomDiscard {
    fn admit(&mut self, xid: &Xid) -> bool {
        if self.rng.gen_range(0..100u8) < self.percent {
            warn!(%xid, "[inject trouble] discard commit event");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_all() {
        assert!(AdmitAll.admit(&Xid::from("x1")));
    }

    #[test]
    fn test_zero_percent_never_discards() {
        let mut admission = RandomDiscard::with_seed(0, 7);
        assert!((0..1000).all(|_| admission.admit(&Xid::from("x1"))));
    }

    #[test]
    fn test_full_percent_always_discards() {
        let mut admission = RandomDiscard::with_seed(100, 7);
        assert!((0..1000).all(|_| !admission.admit(&Xid::from("x1"))));
    }

    #[test]
    fn test_partial_discard_is_reproducible() {
        let run = |seed| {
            let mut admission = RandomDiscard::with_seed(50, seed);
            (0..64)
                .map(|_| admission.admit(&Xid::from("x1")))
                .collect::<Vec<_>>()
        };

        let first = run(42);
        assert_eq!(first, run(42));
        assert!(first.iter().any(|admitted| *admitted));
        assert!(first.iter().any(|admitted| !*admitted));
    }
}
