//! The external collaborator that resolves tree data on demand.

use matchtree_core::{MemberId, TreeIndex, VolumeSnapshot};

/// The children of a resolved node. Either side may be [`MemberId::EMPTY`]
/// for an unfilled slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Children {
    pub left: MemberId,
    pub right: MemberId,
}

/// Failure to resolve one node against the remote store.
///
/// Both variants are recoverable and branch-local: the affected branch is
/// skipped and the rest of an expansion proceeds. The engine never retries;
/// retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The member has no record in the remote store.
    #[error("member not found in the remote store")]
    NotFound,
    /// The resolver call failed for infrastructure reasons.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Read access to the remote affiliate-tree store.
///
/// Implemented by the surrounding application against its database or RPC
/// endpoint. Calls are issued from worker threads and may run concurrently.
pub trait TreeSource: Send + Sync + 'static {
    /// Resolve the direct children of `member`.
    fn resolve_children(&self, member: MemberId) -> Result<Children, SourceError>;

    /// Resolve the aggregate volume snapshot of `member`.
    fn resolve_volume(&self, member: MemberId) -> Result<VolumeSnapshot, SourceError>;

    /// Resolve the implicit tree index assigned to `member` at registration.
    fn resolve_index(&self, member: MemberId) -> Result<TreeIndex, SourceError>;
}
