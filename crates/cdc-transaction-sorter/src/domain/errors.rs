//! Error types for the transaction sorter.

use thiserror::Error;

/// All errors the sorter can surface.
///
/// Protocol violations mean the upstream signal stream is corrupt or out of
/// sync with the sorter. The owning pipeline task must stop; the sorter never
/// retries internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SorterError {
    /// A PreWrite arrived for a xid that is still registered.
    #[error("duplicate xid for: {xid}")]
    DuplicatePreWrite { xid: String },

    /// A Commit arrived for a xid that was never pre-written and is not whitelisted.
    #[error("xid is not existed in trans map for: {xid}")]
    UnmatchedCommit { xid: String },

    /// A second Commit arrived for a xid that is already committed.
    #[error("duplicate commit for: {xid}")]
    DuplicateCommit { xid: String },

    /// A Commit resolved a transaction that carries no virtual TSO.
    #[error("no virtual tso assigned at commit for: {xid}")]
    MissingVirtualTso { xid: String },

    /// A virtual TSO string could not be parsed.
    #[error("invalid virtual tso: {0}")]
    InvalidVirtualTso(String),

    /// Sorter configuration is out of range.
    #[error("invalid sorter config: {0}")]
    InvalidConfig(String),
}

impl SorterError {
    /// Whether the error signals a corrupt stream that must stop the pipeline.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePreWrite { .. }
                | Self::UnmatchedCommit { .. }
                | Self::DuplicateCommit { .. }
                | Self::MissingVirtualTso { .. }
        )
    }
}
