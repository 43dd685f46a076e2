//! A single machine state and its transition map.

use std::fmt;

use smallvec::SmallVec;

use super::store::NodeId;

/// A transition key: a concrete symbol of the runtime alphabet, the default
/// slot (taken when no concrete key applies), or the end-of-input slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Key<U> {
    Unit(U),
    Default,
    Eof,
}

impl<U: fmt::Debug> fmt::Display for Key<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Unit(u) => write!(f, "{u:?}"),
            Key::Default => write!(f, "default"),
            Key::Eof => write!(f, "eof"),
        }
    }
}

/// Accept record attached to a terminal node.
///
/// `back_by` is how many trailing input symbols `find` leaves unconsumed
/// when reporting a match that ends on this node.
#[derive(Clone, PartialEq, Debug)]
pub struct Accept<V> {
    pub value: V,
    pub back_by: u32,
}

/// One machine state.
///
/// Concrete transitions are kept as (unit, target) pairs sorted by unit,
/// binary-searched on lookup. Most nodes have only a handful of outgoing
/// edges. An entry may hold `NodeId::NULL` after a target was nulled; such
/// entries are skipped by the live iteration but still visible to
/// [`Node::entries`].
#[derive(Clone, Debug)]
pub struct Node<V, U> {
    transitions: SmallVec<[(U, NodeId); 4]>,
    default: NodeId,
    eof: NodeId,
    accept: Option<Accept<V>>,
}

impl<V, U> Default for Node<V, U> {
    fn default() -> Self {
        Self {
            transitions: SmallVec::new(),
            default: NodeId::NULL,
            eof: NodeId::NULL,
            accept: None,
        }
    }
}

impl<V, U: Copy + Ord> Node<V, U> {
    /// Read the target under `key`. Absent entries read as `NodeId::NULL`.
    pub fn transition(&self, key: Key<U>) -> NodeId {
        match key {
            Key::Unit(u) => match self.transitions.binary_search_by(|probe| probe.0.cmp(&u)) {
                Ok(pos) => self.transitions[pos].1,
                Err(_) => NodeId::NULL,
            },
            Key::Default => self.default,
            Key::Eof => self.eof,
        }
    }

    /// Write the target under `key`, creating the entry if needed.
    pub fn set_transition(&mut self, key: Key<U>, target: NodeId) {
        match key {
            Key::Unit(u) => match self.transitions.binary_search_by(|probe| probe.0.cmp(&u)) {
                Ok(pos) => self.transitions[pos].1 = target,
                Err(pos) => self.transitions.insert(pos, (u, target)),
            },
            Key::Default => self.default = target,
            Key::Eof => self.eof = target,
        }
    }

    /// Runtime step on one input unit: concrete key first, else default.
    /// The eof slot is never consulted here.
    #[inline]
    pub fn step(&self, unit: U) -> NodeId {
        match self.transitions.binary_search_by(|probe| probe.0.cmp(&unit)) {
            Ok(pos) if !self.transitions[pos].1.is_null() => self.transitions[pos].1,
            _ => self.default,
        }
    }

    /// Every stored slot, including nulled entries and the (possibly null)
    /// default and eof slots.
    pub fn entries(&self) -> Vec<(Key<U>, NodeId)> {
        let mut out = Vec::with_capacity(self.transitions.len() + 2);
        for &(u, target) in &self.transitions {
            out.push((Key::Unit(u), target));
        }
        out.push((Key::Default, self.default));
        out.push((Key::Eof, self.eof));
        out
    }

    /// Visit every non-null transition, concrete keys in sorted order, then
    /// default, then eof.
    pub fn for_each_live(&self, mut f: impl FnMut(Key<U>, NodeId)) {
        for &(u, target) in &self.transitions {
            if !target.is_null() {
                f(Key::Unit(u), target);
            }
        }
        if !self.default.is_null() {
            f(Key::Default, self.default);
        }
        if !self.eof.is_null() {
            f(Key::Eof, self.eof);
        }
    }

    /// Mutable variant of [`Node::for_each_live`].
    pub fn for_each_live_mut(&mut self, mut f: impl FnMut(Key<U>, &mut NodeId)) {
        for (u, target) in self.transitions.iter_mut() {
            if !target.is_null() {
                f(Key::Unit(*u), target);
            }
        }
        if !self.default.is_null() {
            f(Key::Default, &mut self.default);
        }
        if !self.eof.is_null() {
            f(Key::Eof, &mut self.eof);
        }
    }

    /// Redirect every slot pointing at `old` to `new`.
    pub fn rewrite_references(&mut self, old: NodeId, new: NodeId) {
        for (_, target) in self.transitions.iter_mut() {
            if *target == old {
                *target = new;
            }
        }
        if self.default == old {
            self.default = new;
        }
        if self.eof == old {
            self.eof = new;
        }
    }

    pub fn accept(&self) -> Option<&Accept<V>> {
        self.accept.as_ref()
    }

    pub fn set_accept(&mut self, accept: Option<Accept<V>>) {
        self.accept = accept;
    }

    /// A node is null iff it accepts nothing and every slot is null.
    pub fn is_null(&self) -> bool {
        self.accept.is_none()
            && self.default.is_null()
            && self.eof.is_null()
            && self.transitions.iter().all(|(_, t)| t.is_null())
    }

    /// Clear all transitions and the accept record.
    pub fn nullify(&mut self) {
        self.transitions.clear();
        self.default = NodeId::NULL;
        self.eof = NodeId::NULL;
        self.accept = None;
    }
}
