//! Implicit heap-style indexing of the binary affiliate tree.
//!
//! Every member is assigned exactly one index at registration, immutable
//! thereafter. The network root has index 0 and the children of index `p`
//! sit at `2p + 1` (left) and `2p + 2` (right), so a member's position in
//! the tree is fully recoverable from its index alone, without stored
//! parent or child links.
//!
//! All functions here are pure. Passing an index whose children would not
//! fit in 64 bits is a contract violation and panics; the affiliate tree is
//! nowhere near 63 levels deep.

/// A position in the conceptually infinite binary tree.
pub type TreeIndex = u64;

/// The index of the network root.
pub const ROOT_INDEX: TreeIndex = 0;

// The deepest index whose right child is still representable in 64 bits.
const MAX_INDEX: TreeIndex = (u64::MAX - 2) / 2;

/// Which branch of an ancestor a descendant hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// The index of the left child of `id`.
pub fn left_child(id: TreeIndex) -> TreeIndex {
    assert!(id <= MAX_INDEX, "tree index overflows 64 bits");
    id * 2 + 1
}

/// The index of the right child of `id`.
pub fn right_child(id: TreeIndex) -> TreeIndex {
    assert!(id <= MAX_INDEX, "tree index overflows 64 bits");
    id * 2 + 2
}

/// The index of the parent of `id`, or `None` for the root.
pub fn parent(id: TreeIndex) -> Option<TreeIndex> {
    if id == ROOT_INDEX {
        None
    } else if id % 2 == 1 {
        // a left child
        Some((id - 1) / 2)
    } else {
        // a right child
        Some((id - 2) / 2)
    }
}

/// Which branch of `ancestor` the member at `id` lives under.
///
/// Walks `id` upward and reports the side at which the walk enters
/// `ancestor`. Returns `None` when `ancestor` is not a strict ancestor of
/// `id` (including `id == ancestor` and `id == 0`). The walk terminates
/// because parent indices strictly decrease, at most 64 steps.
pub fn side_of(id: TreeIndex, ancestor: TreeIndex) -> Option<Side> {
    let mut cur = id;
    while let Some(p) = parent(cur) {
        if p == ancestor {
            // odd indices are left children.
            return Some(if cur % 2 == 1 {
                Side::Left
            } else {
                Side::Right
            });
        }
        if p < ancestor {
            // walked past it; `ancestor` is not on the path to the root.
            return None;
        }
        cur = p;
    }
    None
}

/// The number of parent steps from `id` up to `ancestor`.
///
/// `level_of(id, id) == 0`. Returns `None` when `ancestor` is unreachable
/// from `id`.
pub fn level_of(id: TreeIndex, ancestor: TreeIndex) -> Option<u32> {
    if id == ancestor {
        return Some(0);
    }
    let mut cur = id;
    let mut level = 0;
    while let Some(p) = parent(cur) {
        level += 1;
        if p == ancestor {
            return Some(level);
        }
        if p < ancestor {
            return None;
        }
        cur = p;
    }
    None
}
