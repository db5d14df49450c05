//! Configuration for the transaction sorter.

use crate::domain::entities::SortLimits;
use crate::domain::errors::SorterError;
use serde::{Deserialize, Serialize};

/// Separator used by the operator-facing skip whitelist string.
pub const WHITELIST_SEPARATOR: char = '#';

/// Sorter configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    /// Arrival queue length above which the head is checked against the whitelist
    pub skip_threshold: usize,
    /// Wall-clock budget for one arrival queue scan (milliseconds)
    pub scan_budget_ms: u64,
    /// Xids whose missing counterpart signal may be ignored
    pub skip_whitelist: Vec<String>,
    /// Randomly drop commit signals (test environments only)
    pub random_discard_commit: bool,
    /// Drop probability in percent when random discard is enabled
    pub discard_commit_percent: u8,
}

impl SorterConfig {
    /// Replace the whitelist from the `#`-separated operator string.
    pub fn with_whitelist_str(mut self, whitelist: &str) -> Self {
        self.skip_whitelist = parse_whitelist(whitelist);
        self
    }

    pub fn validate(&self) -> Result<(), SorterError> {
        if self.scan_budget_ms == 0 {
            return Err(SorterError::InvalidConfig(
                "scan_budget_ms must be positive".to_string(),
            ));
        }
        if self.discard_commit_percent > 100 {
            return Err(SorterError::InvalidConfig(format!(
                "discard_commit_percent {} exceeds 100",
                self.discard_commit_percent
            )));
        }
        Ok(())
    }

    /// Limits handed to the sorter.
    pub fn limits(&self) -> SortLimits {
        SortLimits {
            skip_threshold: self.skip_threshold,
            scan_budget_ms: self.scan_budget_ms,
        }
    }
}

impl Default for SorterConfig {
    fn default() -> Self {
        let limits = SortLimits::default();
        Self {
            skip_threshold: limits.skip_threshold,
            scan_budget_ms: limits.scan_budget_ms,
            skip_whitelist: Vec::new(),
            random_discard_commit: false,
            discard_commit_percent: 5,
        }
    }
}

/// Split a `#`-separated whitelist, ignoring blank entries.
pub fn parse_whitelist(whitelist: &str) -> Vec<String> {
    whitelist
        .split(WHITELIST_SEPARATOR)
        .map(str::trim)
        .filter(|xid| !xid.is_empty())
        .map(str::to_string)
        .collect()
}
