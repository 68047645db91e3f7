//! Core types and operations for a lazily revealed binary affiliate network.
//!
//! This crate defines the schema of the network in a backend-agnostic manner:
//! member identifiers, the implicit heap-style indexing that recovers a
//! member's tree position from a single integer, and the volume-matching
//! arithmetic behind the binary ("weak leg") bonus.
//!
//! Nothing here performs I/O or holds state; the stateful expansion engine
//! lives in the `matchtree` crate.

pub mod index;
pub mod matching;
pub mod member;

pub use index::{Side, TreeIndex};
pub use matching::{compute_matching, MatchingResult, VolumeSnapshot};
pub use member::MemberId;
