//! Skip Policy Adapters
//!
//! Whitelist-backed implementations of the `SkipPolicy` port.

use crate::config::parse_whitelist;
use crate::ports::outbound::SkipPolicy;
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::info;

/// Operator-curated list of xids known to have lost a commit or rollback.
///
/// Share it through an `Arc` to update the list while a sorter holds it;
/// every lookup reads the current contents.
#[derive(Debug, Default)]
pub struct WhitelistSkipPolicy {
    xids: RwLock<HashSet<String>>,
}

impl WhitelistSkipPolicy {
    pub fn new<I, S>(xids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            xids: RwLock::new(xids.into_iter().map(Into::into).collect()),
        }
    }

    /// Build from the `#`-separated operator string.
    pub fn parse(whitelist: &str) -> Self {
        Self::new(parse_whitelist(whitelist))
    }

    /// Swap in a new list, e.g. after a dynamic config refresh.
    pub fn replace<I, S>(&self, xids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let updated: HashSet<String> = xids.into_iter().map(Into::into).collect();
        info!(entries = updated.len(), "Skip whitelist replaced");
        *self.xids.write() = updated;
    }

    pub fn insert(&self, xid: impl Into<String>) -> bool {
        self.xids.write().insert(xid.into())
    }

    pub fn remove(&self, xid: &str) -> bool {
        self.xids.write().remove(xid)
    }

    pub fn len(&self) -> usize {
        self.xids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.xids.read().is_empty()
    }
}

impl SkipPolicy for WhitelistSkipPolicy {
    fn should_skip(&self, xid: &str) -> bool {
        self.xids.read().contains(xid)
    }
}

/// Policy that never skips anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSkip;

impl SkipPolicy for NeverSkip {
    fn should_skip(&self, _xid: &str) -> bool {
        false
    }
}
