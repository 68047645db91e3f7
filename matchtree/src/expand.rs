//! Expansion strategies over the lazily revealed tree.

use crate::{
    cache::{NodeCache, NodePromise, TreeView},
    source::{SourceError, TreeSource},
    Options,
};
use log::warn;
use matchtree_core::{index, MemberId, Side, VolumeSnapshot};
use std::{
    cmp::Ordering,
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering::Relaxed},
        Arc,
    },
};
use threadpool::ThreadPool;

/// How far and where an expansion reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Breadth-first, revealing the given number of levels below the root.
    FixedDepth(u32),
    /// Follow a single leg at every node, up to the given depth.
    Direction(Side, u32),
    /// Follow the dominant or weak leg by subtree volume. Ties descend into
    /// both children; the walk stops where both volumes are zero.
    Dominance(Dominance),
}

/// Which leg a [`Strategy::Dominance`] expansion follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    /// The larger-volume side.
    Strong,
    /// The smaller-volume side.
    Weak,
}

/// Cooperative cancellation for an expansion call.
///
/// Cancelling stops the scheduling of new resolutions; ones already in
/// flight complete and still populate the cache. Partial results are valid,
/// not discarded. A caller-side timeout should cancel rather than abort.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Relaxed)
    }
}

/// What one expansion call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandReport {
    /// Nodes whose children became known during this call.
    pub resolved: usize,
    /// Branches that were not expanded because their node could not be
    /// resolved. Local and recoverable; siblings were still walked.
    pub skipped: Vec<(MemberId, SourceError)>,
    /// Whether the call stopped scheduling early due to cancellation.
    pub cancelled: bool,
}

/// A member's position relative to an ancestor, derived from the implicit
/// indices the store assigned at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Which leg of the ancestor the member is under; `None` if the
    /// ancestor is not a strict ancestor.
    pub side: Option<Side>,
    /// Parent steps from the member up to the ancestor; `None` if
    /// unreachable.
    pub level: Option<u32>,
}

/// Grows one session's [`NodeCache`] on demand.
///
/// One expander per tree view: it owns the cache, is its only writer, and is
/// constructed and discarded with the view's lifetime. Independent views get
/// independent expanders; there is no process-wide cache.
pub struct TreeExpander {
    cache: NodeCache,
    source: Arc<dyn TreeSource>,
    /// Pool for dominance volume lookups. Children resolutions run on the
    /// cache's own fetch pool.
    volume_tp: ThreadPool,
}

/// A frontier node whose resolutions have been issued but not awaited.
struct PendingNode {
    member: MemberId,
    budget: u32,
    was_known: bool,
    children: NodePromise,
    volume: Option<crossbeam_channel::Receiver<Result<VolumeSnapshot, SourceError>>>,
}

impl TreeExpander {
    /// Create a new `TreeExpander` atop the provided [`TreeSource`].
    pub fn new(source: Arc<dyn TreeSource>, o: Options) -> Self {
        TreeExpander {
            cache: NodeCache::new(Arc::clone(&source), &o),
            source,
            volume_tp: ThreadPool::new(o.volume_concurrency),
        }
    }

    /// A read handle onto this session's cache.
    pub fn cache(&self) -> &NodeCache {
        &self.cache
    }

    /// Expand the tree under `root` per `strategy`, blocking until the walk
    /// completes. The caller then reads the cache via [`Self::snapshot_tree`]
    /// or a cache handle.
    pub fn expand(&self, root: MemberId, strategy: Strategy) -> ExpandReport {
        self.expand_with_cancel(root, strategy, &CancelToken::new())
    }

    /// Like [`Self::expand`], stopping early when `cancel` fires.
    pub fn expand_with_cancel(
        &self,
        root: MemberId,
        strategy: Strategy,
        cancel: &CancelToken,
    ) -> ExpandReport {
        let mut report = ExpandReport::default();
        if root.is_empty() {
            return report;
        }

        // Each frontier entry carries its remaining depth budget; dominance
        // walks are bounded by their volume termination rule instead.
        let mut frontier: Vec<(MemberId, u32)> = match strategy {
            Strategy::FixedDepth(0) | Strategy::Direction(_, 0) => return report,
            Strategy::FixedDepth(n) | Strategy::Direction(_, n) => vec![(root, n)],
            Strategy::Dominance(_) => vec![(root, u32::MAX)],
        };
        let mut visited: HashSet<MemberId> = HashSet::new();

        while !frontier.is_empty() && !report.cancelled {
            // Issue the whole wave before awaiting any of it; the fetch pool
            // runs sibling resolutions concurrently and the cache inflight
            // table guarantees at most one resolver call per member.
            let mut wave = Vec::with_capacity(frontier.len());
            for (member, budget) in frontier.drain(..) {
                if cancel.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                if !visited.insert(member) {
                    continue;
                }
                let was_known = self.cache.ensure(member).children_known;
                let children = self.cache.resolve(member);
                let volume = match strategy {
                    Strategy::Dominance(_) => Some(self.fetch_volume(member)),
                    _ => None,
                };
                wave.push(PendingNode {
                    member,
                    budget,
                    was_known,
                    children,
                    volume,
                });
            }

            for pending in wave {
                let children = match pending.children.wait() {
                    Ok(children) => children,
                    Err(err) => {
                        warn!("skipping branch at {}: {err}", pending.member);
                        report.skipped.push((pending.member, err));
                        continue;
                    }
                };
                if !pending.was_known {
                    report.resolved += 1;
                }

                match strategy {
                    Strategy::FixedDepth(_) => {
                        if pending.budget > 1 {
                            for child in [children.left, children.right] {
                                if !child.is_empty() {
                                    frontier.push((child, pending.budget - 1));
                                }
                            }
                        }
                    }
                    Strategy::Direction(side, _) => {
                        if pending.budget > 1 {
                            let child = match side {
                                Side::Left => children.left,
                                Side::Right => children.right,
                            };
                            if !child.is_empty() {
                                frontier.push((child, pending.budget - 1));
                            }
                        }
                    }
                    Strategy::Dominance(mode) => {
                        // UNWRAP: a volume fetch is issued for every
                        // dominance frontier node.
                        let snapshot = match Self::wait_volume(pending.volume.unwrap()) {
                            Ok(snapshot) => snapshot,
                            Err(err) => {
                                warn!("no volume for {}: {err}", pending.member);
                                report.skipped.push((pending.member, err));
                                continue;
                            }
                        };
                        // No further signal to follow.
                        if snapshot.volume_left == 0 && snapshot.volume_right == 0 {
                            continue;
                        }
                        let descend: [MemberId; 2] =
                            match (mode, snapshot.volume_left.cmp(&snapshot.volume_right)) {
                                (_, Ordering::Equal) => [children.left, children.right],
                                (Dominance::Strong, Ordering::Greater)
                                | (Dominance::Weak, Ordering::Less) => {
                                    [children.left, MemberId::EMPTY]
                                }
                                (Dominance::Strong, Ordering::Less)
                                | (Dominance::Weak, Ordering::Greater) => {
                                    [children.right, MemberId::EMPTY]
                                }
                            };
                        for child in descend {
                            if !child.is_empty() {
                                frontier.push((child, u32::MAX));
                            }
                        }
                    }
                }
            }
        }
        report
    }

    /// Collapse `member`, discarding its cached subtree.
    pub fn collapse(&self, member: MemberId) {
        self.cache.collapse(member);
    }

    /// A read-only snapshot of the known tree under `root`, for rendering.
    pub fn snapshot_tree(&self, root: MemberId) -> TreeView {
        self.cache.snapshot(root)
    }

    /// The side and level of `member` relative to `root`, derived from the
    /// implicit indices alone.
    pub fn relation_to(&self, root: MemberId, member: MemberId) -> Result<Relation, SourceError> {
        let root_index = self.source.resolve_index(root)?;
        let member_index = self.source.resolve_index(member)?;
        Ok(Relation {
            side: index::side_of(member_index, root_index),
            level: index::level_of(member_index, root_index),
        })
    }

    fn fetch_volume(
        &self,
        member: MemberId,
    ) -> crossbeam_channel::Receiver<Result<VolumeSnapshot, SourceError>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let source = Arc::clone(&self.source);
        self.volume_tp.execute(move || {
            let _ = tx.send(source.resolve_volume(member));
        });
        rx
    }

    fn wait_volume(
        rx: crossbeam_channel::Receiver<Result<VolumeSnapshot, SourceError>>,
    ) -> Result<VolumeSnapshot, SourceError> {
        rx.recv()
            .unwrap_or_else(|_| Err(SourceError::Transport("volume worker lost".into())))
    }
}
