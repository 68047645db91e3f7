use matchtree::{
    index, Children, MemberId, Options, SourceError, TreeExpander, TreeIndex, TreeSource,
    VolumeSnapshot,
};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Condvar, Mutex},
};

/// A short member id; `n` must be non-zero to stay clear of the EMPTY
/// sentinel.
pub fn member(n: u8) -> MemberId {
    assert!(n > 0);
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    MemberId::from_bytes(bytes)
}

/// A deterministic in-memory tree store that counts resolver calls.
#[derive(Default)]
pub struct MockSource {
    slots: HashMap<TreeIndex, MemberId>,
    indices: HashMap<MemberId, TreeIndex>,
    volumes: HashMap<MemberId, (u128, u128)>,
    failing_children: HashSet<MemberId>,
    failing_volumes: HashSet<MemberId>,
    gated_children: HashSet<MemberId>,
    gate: Mutex<Gate>,
    gate_cv: Condvar,
    children_calls: Mutex<HashMap<MemberId, usize>>,
}

#[derive(Default)]
struct Gate {
    arrived: usize,
    open: bool,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill slots `0..count` with members `1..=count`: a perfect tree with
    /// `member(i + 1)` at index `i`.
    pub fn perfect_tree(count: u8) -> Self {
        let mut source = Self::new();
        for i in 0..count {
            source.place(i as TreeIndex, member(i + 1));
        }
        source
    }

    pub fn place(&mut self, index: TreeIndex, member: MemberId) {
        self.slots.insert(index, member);
        self.indices.insert(member, index);
    }

    pub fn volume(&mut self, member: MemberId, left: u128, right: u128) {
        self.volumes.insert(member, (left, right));
    }

    pub fn fail_children(&mut self, member: MemberId) {
        self.failing_children.insert(member);
    }

    pub fn fail_volume(&mut self, member: MemberId) {
        self.failing_volumes.insert(member);
    }

    /// Make `member`'s children resolution block until [`Self::open_gate`].
    pub fn gate_children(&mut self, member: MemberId) {
        self.gated_children.insert(member);
    }

    /// Block until `n` gated resolutions have started.
    pub fn wait_gate_arrivals(&self, n: usize) {
        let mut gate = self.gate.lock().unwrap();
        while gate.arrived < n {
            gate = self.gate_cv.wait(gate).unwrap();
        }
    }

    /// Let all gated resolutions proceed.
    pub fn open_gate(&self) {
        self.gate.lock().unwrap().open = true;
        self.gate_cv.notify_all();
    }

    pub fn children_calls(&self, member: MemberId) -> usize {
        *self
            .children_calls
            .lock()
            .unwrap()
            .get(&member)
            .unwrap_or(&0)
    }
}

impl TreeSource for MockSource {
    fn resolve_children(&self, member: MemberId) -> Result<Children, SourceError> {
        *self
            .children_calls
            .lock()
            .unwrap()
            .entry(member)
            .or_default() += 1;
        if self.failing_children.contains(&member) {
            return Err(SourceError::Transport("injected failure".into()));
        }
        if self.gated_children.contains(&member) {
            let mut gate = self.gate.lock().unwrap();
            gate.arrived += 1;
            self.gate_cv.notify_all();
            while !gate.open {
                gate = self.gate_cv.wait(gate).unwrap();
            }
        }
        let id = *self.indices.get(&member).ok_or(SourceError::NotFound)?;
        let at = |slot: TreeIndex| self.slots.get(&slot).copied().unwrap_or(MemberId::EMPTY);
        Ok(Children {
            left: at(index::left_child(id)),
            right: at(index::right_child(id)),
        })
    }

    fn resolve_volume(&self, member: MemberId) -> Result<VolumeSnapshot, SourceError> {
        if self.failing_volumes.contains(&member) {
            return Err(SourceError::Transport("injected failure".into()));
        }
        if !self.indices.contains_key(&member) {
            return Err(SourceError::NotFound);
        }
        let (volume_left, volume_right) = self.volumes.get(&member).copied().unwrap_or((0, 0));
        Ok(VolumeSnapshot {
            volume_left,
            volume_right,
            ..Default::default()
        })
    }

    fn resolve_index(&self, member: MemberId) -> Result<TreeIndex, SourceError> {
        self.indices.get(&member).copied().ok_or(SourceError::NotFound)
    }
}

/// Wire a mock up to an expander, keeping a handle on the mock for call
/// assertions.
pub fn expander(source: MockSource) -> (Arc<MockSource>, TreeExpander) {
    let source = Arc::new(source);
    let dyn_source: Arc<dyn TreeSource> = source.clone();
    (source, TreeExpander::new(dyn_source, Options::new()))
}
