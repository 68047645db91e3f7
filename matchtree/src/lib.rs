//! Lazy expansion engine for a binary affiliate network.
//!
//! The network is a conceptually infinite binary tree addressed by implicit
//! heap-style indices and revealed incrementally from a remote store. A
//! [`TreeExpander`] owns one session's [`NodeCache`] and grows it on demand:
//! by fixed depth, down a single leg, or guided by subtree volume dominance.
//! Resolutions against the [`TreeSource`] collaborator run concurrently on a
//! bounded pool and are deduplicated per member, so the store sees at most
//! one call per node per expansion.
//!
//! Reading is separated from mutation: renderers take a detached [`TreeView`]
//! snapshot or subscribe to [`CacheEvent`]s, and the volume-matching figures
//! behind the weak-leg bonus are computed by the pure [`compute_matching`]
//! re-exported from `matchtree-core`.

pub use matchtree_core::{
    compute_matching, index,
    matching::{MatchingResult, VolumeInconsistency},
    member::MemberIdError,
    MemberId, Side, TreeIndex, VolumeSnapshot,
};

mod cache;
mod expand;
mod options;
mod source;

pub use cache::{CacheEvent, NodeCache, TreeNode, TreeView};
pub use expand::{CancelToken, Dominance, ExpandReport, Relation, Strategy, TreeExpander};
pub use options::Options;
pub use source::{Children, SourceError, TreeSource};
