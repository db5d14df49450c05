//! Outbound (Driven) ports for the transaction sorter.
//!
//! Policies and clocks the sorter consults but does not own.

use crate::domain::value_objects::Xid;
use std::time::{Duration, Instant};

/// Milliseconds on a monotonic clock.
pub type Timestamp = u64;

/// Decides whether a xid with a missing counterpart signal may be discarded.
///
/// Evaluated on every call; implementations must not cache negative answers,
/// since operators update the backing list while the pipeline runs.
pub trait SkipPolicy: Send + Sync {
    fn should_skip(&self, xid: &str) -> bool;
}

/// Gate applied to every commit signal before it is processed.
///
/// Production uses an admit-all strategy. Test environments may plug in a
/// strategy that drops commits to provoke stuck transactions.
pub trait CommitAdmission: Send {
    /// Returns false to drop the commit signal.
    fn admit(&mut self, xid: &Xid) -> bool;
}

/// Time source for the drain scan budget.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Monotonic time source measured from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        millis(self.origin.elapsed())
    }
}

/// Whole milliseconds, saturating at `Timestamp::MAX`.
fn millis(elapsed: Duration) -> Timestamp {
    Timestamp::try_from(elapsed.as_millis()).unwrap_or(Timestamp::MAX)
}
