//! In-memory store of the partially known tree, with deduplicated lazy
//! resolution against the remote source.

use crate::{
    source::{Children, SourceError, TreeSource},
    Options,
};
use log::debug;
use matchtree_core::MemberId;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use threadpool::ThreadPool;

/// One member's slot in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode {
    pub member: MemberId,
    /// Left child; meaningless until `children_known`.
    pub left: MemberId,
    /// Right child; meaningless until `children_known`.
    pub right: MemberId,
    /// Whether children have been fetched. Readers must treat `false` as
    /// authoritative even while a resolution is in flight.
    pub children_known: bool,
}

impl TreeNode {
    fn unknown(member: MemberId) -> Self {
        TreeNode {
            member,
            left: MemberId::EMPTY,
            right: MemberId::EMPTY,
            children_known: false,
        }
    }
}

/// A change to the cache, delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// The member's children became known.
    Resolved(MemberId),
    /// The member's subtree was discarded.
    Collapsed(MemberId),
}

/// A read-only, recursive view of the known tree under one member, detached
/// from the cache for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeView {
    pub member: MemberId,
    /// Whether the children of this node have been fetched.
    pub children_known: bool,
    /// `None` for an unfilled slot or unfetched children.
    pub left: Option<Box<TreeView>>,
    pub right: Option<Box<TreeView>>,
}

pub enum NodePromise {
    Now(Result<Children, SourceError>),
    Later(crossbeam_channel::Receiver<Result<Children, SourceError>>),
}

impl NodePromise {
    /// Waits for the resolution to finish.
    pub fn wait(self) -> Result<Children, SourceError> {
        match self {
            NodePromise::Now(result) => result,
            NodePromise::Later(rx) => rx
                .recv()
                .unwrap_or_else(|_| Err(SourceError::Transport("resolver worker lost".into()))),
        }
    }
}

/// A resolution currently running on the fetch pool. Every branch reaching
/// the same member while it is pending subscribes here, so the source sees
/// at most one call per member.
struct InflightResolve {
    waiters: Vec<crossbeam_channel::Sender<Result<Children, SourceError>>>,
}

impl InflightResolve {
    fn new() -> Self {
        InflightResolve {
            waiters: Vec::new(),
        }
    }

    fn subscribe(&mut self) -> NodePromise {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.waiters.push(tx);
        NodePromise::Later(rx)
    }

    /// Notifies all the waiting parties and destroys this handle.
    fn complete_and_notify(self, result: Result<Children, SourceError>) {
        for tx in self.waiters {
            let _ = tx.send(result.clone());
        }
    }
}

/// The node cache is the in-memory layer between tree consumers and the
/// remote store.
///
/// Handles are cheap to clone and all clones share state. Ownership is
/// single-writer, multiple-reader: one expander drives resolutions and
/// mutation for its session, while renderers may hold read handles and
/// inspect the cache mid-expansion.
#[derive(Clone)]
pub struct NodeCache {
    shared: Arc<Mutex<Shared>>,
    source: Arc<dyn TreeSource>,
    /// The thread pool used for resolver calls.
    ///
    /// Used for limiting the number of concurrent resolutions.
    fetch_tp: ThreadPool,
}

struct Shared {
    nodes: HashMap<MemberId, TreeNode>,
    /// Members with a resolver call currently running.
    inflight: HashMap<MemberId, InflightResolve>,
    subscribers: Vec<crossbeam_channel::Sender<CacheEvent>>,
}

impl NodeCache {
    /// Create a new `NodeCache` atop the provided [`TreeSource`].
    pub(crate) fn new(source: Arc<dyn TreeSource>, o: &Options) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            nodes: HashMap::new(),
            inflight: HashMap::new(),
            subscribers: Vec::new(),
        }));
        let fetch_tp = ThreadPool::new(o.fetch_concurrency);
        Self {
            shared,
            source,
            fetch_tp,
        }
    }

    /// The cached node for `member`, or `None` if never referenced.
    pub fn get(&self, member: MemberId) -> Option<TreeNode> {
        self.shared.lock().nodes.get(&member).copied()
    }

    /// Returns the existing entry or inserts a fresh unresolved one. No
    /// network effect.
    pub fn ensure(&self, member: MemberId) -> TreeNode {
        *self
            .shared
            .lock()
            .nodes
            .entry(member)
            .or_insert_with(|| TreeNode::unknown(member))
    }

    /// Marks `member` resolved with the given children, overwriting any
    /// previous (stale) ones. Unknown placeholders are inserted for both
    /// non-empty children so callers can probe them without another round
    /// trip.
    pub fn set_children(&self, member: MemberId, left: MemberId, right: MemberId) {
        let mut shared = self.shared.lock();
        shared.apply_children(member, left, right);
        shared.emit(CacheEvent::Resolved(member));
    }

    /// Resets `member` to unresolved and removes every cached descendant,
    /// bounding memory after deep exploration.
    pub fn collapse(&self, member: MemberId) {
        let mut shared = self.shared.lock();
        let Some(node) = shared.nodes.get(&member).copied() else {
            return;
        };
        if node.children_known {
            shared.remove_subtree(node.left);
            shared.remove_subtree(node.right);
        }
        shared.nodes.insert(member, TreeNode::unknown(member));
        shared.emit(CacheEvent::Collapsed(member));
    }

    /// Subscribe to cache changes.
    ///
    /// Events are delivered over an unbounded channel; a dropped receiver
    /// unsubscribes on the next emission.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<CacheEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.shared.lock().subscribers.push(tx);
        rx
    }

    /// A read-only projection of the known tree under `root`.
    pub fn snapshot(&self, root: MemberId) -> TreeView {
        self.shared.lock().project(root)
    }

    /// Resolves `member`'s children.
    ///
    /// Served from the cache when already known. Otherwise at most one
    /// resolver call is in flight per member; later requesters await its
    /// result rather than re-issuing the call. A failed resolution leaves
    /// the node unresolved, never half-written.
    pub(crate) fn resolve(&self, member: MemberId) -> NodePromise {
        let mut shared = self.shared.lock();

        if let Some(node) = shared.nodes.get(&member) {
            if node.children_known {
                return NodePromise::Now(Ok(Children {
                    left: node.left,
                    right: node.right,
                }));
            }
        }
        if let Some(inflight) = shared.inflight.get_mut(&member) {
            return inflight.subscribe();
        }

        let mut inflight = InflightResolve::new();
        let promise = inflight.subscribe();
        shared.inflight.insert(member, inflight);
        drop(shared);

        debug!("resolving children of {member}");
        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.shared);
        self.fetch_tp.execute(move || {
            let result = source.resolve_children(member);
            let mut shared = shared.lock();
            // UNWRAP: the entry was inserted above and is removed only here.
            let inflight = shared.inflight.remove(&member).unwrap();
            if let Ok(children) = &result {
                shared.apply_children(member, children.left, children.right);
                shared.emit(CacheEvent::Resolved(member));
            }
            inflight.complete_and_notify(result);
        });
        promise
    }
}

impl Shared {
    fn apply_children(&mut self, member: MemberId, left: MemberId, right: MemberId) {
        let node = self
            .nodes
            .entry(member)
            .or_insert_with(|| TreeNode::unknown(member));
        node.left = left;
        node.right = right;
        node.children_known = true;
        for child in [left, right] {
            if !child.is_empty() {
                self.nodes
                    .entry(child)
                    .or_insert_with(|| TreeNode::unknown(child));
            }
        }
    }

    fn remove_subtree(&mut self, member: MemberId) {
        if member.is_empty() {
            return;
        }
        let mut stack = vec![member];
        while let Some(m) = stack.pop() {
            let Some(node) = self.nodes.remove(&m) else {
                continue;
            };
            if node.children_known {
                for child in [node.left, node.right] {
                    if !child.is_empty() {
                        stack.push(child);
                    }
                }
            }
        }
    }

    fn emit(&mut self, event: CacheEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    fn project(&self, member: MemberId) -> TreeView {
        let node = self
            .nodes
            .get(&member)
            .copied()
            .unwrap_or_else(|| TreeNode::unknown(member));
        let (left, right) = if node.children_known {
            (self.project_child(node.left), self.project_child(node.right))
        } else {
            (None, None)
        };
        TreeView {
            member,
            children_known: node.children_known,
            left,
            right,
        }
    }

    fn project_child(&self, child: MemberId) -> Option<Box<TreeView>> {
        if child.is_empty() {
            None
        } else {
            Some(Box::new(self.project(child)))
        }
    }
}
