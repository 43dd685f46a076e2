//! Graph canonicalization.
//!
//! Construction leaves behind orphaned clones and duplicated sub-graphs.
//! The optimizer nulls out references to empty nodes, folds structurally
//! equal nodes (including self-referential cycles), drops everything
//! unreachable from the root and finally compacts the store, remapping
//! every surviving reference and cursor. The caller-visible guarantee is
//! that `matches`, `find` and `find_many` behave identically before and
//! after.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::store::{NodeId, NodeStore};
use super::symbol::Symbol;
use super::StateMachine;

impl<V: Clone + PartialEq, T: Symbol> StateMachine<V, T> {
    /// Run the full canonicalization pipeline.
    pub fn optimize(&mut self) -> &mut Self {
        let before = self.nodes.len();
        self.nullify_nullrefs();
        self.remove_duplicates();
        self.nullify_nullrefs();
        self.remove_duplicates();
        self.nullify_orphans();
        self.remove_blanks();
        log::debug!("optimize: {} -> {} nodes", before, self.nodes.len());
        self
    }

    fn is_deletable_node(&self, idx: NodeId) -> bool {
        idx != NodeId::ROOT && self.nodes[idx].is_null() && !self.has_cursor(idx)
    }

    /// Replace every transition into a deletable node with null. Each
    /// rewrite may newly empty its owner, so iterate to a fixpoint.
    pub(crate) fn nullify_nullrefs(&mut self) {
        let len = self.nodes.len();
        let mut nulls = vec![false; len];
        for i in 1..=len {
            if self.is_deletable_node(NodeId::from_index(i)) {
                nulls[i - 1] = true;
            }
        }

        loop {
            let mut has_nulled = false;
            for i in 1..=len {
                if nulls[i - 1] {
                    continue;
                }
                let id = NodeId::from_index(i);
                self.nodes[id].for_each_live_mut(|_key, target| {
                    if nulls[target.get() - 1] {
                        *target = NodeId::NULL;
                    }
                });
                if self.is_deletable_node(id) {
                    has_nulled = true;
                    nulls[i - 1] = true;
                }
            }
            if !has_nulled {
                break;
            }
        }
    }

    /// Fold duplicate nodes until a pass removes nothing. Duplicate chains
    /// unlock further folds, hence the repetition.
    pub(crate) fn remove_duplicates(&mut self) {
        let mut passes = 0usize;
        while self.remove_duplicates_once() {
            passes += 1;
        }
        log::trace!("remove_duplicates: converged after {passes} folding passes");
    }

    fn remove_duplicates_once(&mut self) -> bool {
        let len = self.nodes.len();
        let mut has_removed = false;

        let mut cursored = vec![false; len];
        for &c in &self.construction.cursors {
            cursored[c.get() - 1] = true;
        }

        // Structural fingerprints reject most candidate pairs cheaply; a
        // fold can leave them stale, but stale ones only defer a fold to
        // the next pass, never fabricate one - equality is verified exactly.
        let mut fingerprints = vec![0u64; len];
        for i in 1..=len {
            fingerprints[i - 1] = self.fingerprint(NodeId::from_index(i), cursored[i - 1]);
        }

        // Reverse scan, so chains fold bottom-up within one pass.
        for i in (2..=len).rev() {
            let node_idx = NodeId::from_index(i);
            if self.nodes[node_idx].is_null() && !cursored[i - 1] {
                continue;
            }

            let mut matchers = Vec::new();
            for j in 2..i {
                let other_idx = NodeId::from_index(j);
                if self.nodes[other_idx].is_null() && !cursored[j - 1] {
                    continue;
                }
                if cursored[j - 1] != cursored[i - 1] {
                    continue;
                }
                if fingerprints[j - 1] != fingerprints[i - 1] {
                    continue;
                }
                if self.nodes[node_idx].accept() != self.nodes[other_idx].accept() {
                    continue;
                }
                if !self.transitions_equal(node_idx, other_idx) {
                    continue;
                }
                matchers.push(other_idx);
            }

            if !matchers.is_empty() {
                has_removed = true;
                for old_idx in matchers {
                    for k in 1..=len {
                        self.nodes[NodeId::from_index(k)].for_each_live_mut(|_key, target| {
                            if *target == old_idx {
                                *target = node_idx;
                            }
                        });
                    }
                    self.nodes[old_idx].nullify();
                    cursored[old_idx.get() - 1] = false;
                }
            }
        }

        self.construction.cursors = cursored
            .iter()
            .enumerate()
            .filter(|&(_, &is_cursor)| is_cursor)
            .map(|(i, _)| NodeId::from_index(i + 1))
            .collect();
        has_removed
    }

    /// Structural hash with self-references normalized, so two nodes that
    /// only differ by which index their cycle loops through can still land
    /// in the same bucket.
    fn fingerprint(&self, idx: NodeId, is_cursor: bool) -> u64 {
        let mut hasher = FxHasher::default();
        is_cursor.hash(&mut hasher);
        match self.nodes[idx].accept() {
            Some(accept) => {
                1u8.hash(&mut hasher);
                accept.back_by.hash(&mut hasher);
            }
            None => 0u8.hash(&mut hasher),
        }
        self.nodes[idx].for_each_live(|key, target| {
            key.hash(&mut hasher);
            let normalized = if target == idx {
                u32::MAX
            } else {
                target.raw()
            };
            normalized.hash(&mut hasher);
        });
        hasher.finish()
    }

    /// Two nodes have equal transition sets when their live keys agree and
    /// each pair of targets is either identical or both self-referring.
    fn transitions_equal(&self, a: NodeId, b: NodeId) -> bool {
        let mut entries_a = Vec::new();
        self.nodes[a].for_each_live(|key, target| entries_a.push((key, target)));
        let mut entries_b = Vec::new();
        self.nodes[b].for_each_live(|key, target| entries_b.push((key, target)));

        if entries_a.len() != entries_b.len() {
            return false;
        }
        entries_a
            .iter()
            .zip(entries_b.iter())
            .all(|(&(key_a, target_a), &(key_b, target_b))| {
                key_a == key_b && (target_a == target_b || (target_a == a && target_b == b))
            })
    }

    /// Nullify every node unreachable from the root, then drop cursors that
    /// pointed into the removed region.
    pub(crate) fn nullify_orphans(&mut self) {
        let len = self.nodes.len();
        let mut reachable = vec![false; len];
        reachable[0] = true;

        loop {
            let mut expanded = false;
            for i in 1..=len {
                if !reachable[i - 1] {
                    continue;
                }
                self.nodes[NodeId::from_index(i)].for_each_live(|_key, target| {
                    if !reachable[target.get() - 1] {
                        reachable[target.get() - 1] = true;
                        expanded = true;
                    }
                });
            }
            if !expanded {
                break;
            }
        }

        for cursor in self.construction.cursors.iter_mut() {
            if !reachable[cursor.get() - 1] {
                *cursor = NodeId::NULL;
            }
        }
        for i in 1..=len {
            if !reachable[i - 1] {
                self.nodes[NodeId::from_index(i)].nullify();
            }
        }
        self.construction.cursors.retain(|c| !c.is_null());
    }

    /// Physically rebuild the store, dropping structurally-null nodes that
    /// are neither the root nor cursored, and remap every reference and
    /// cursor through the old-to-new index mapping.
    pub(crate) fn remove_blanks(&mut self) {
        let old_len = self.nodes.len();
        let mut mappings = vec![NodeId::NULL; old_len];

        let old = std::mem::replace(&mut self.nodes, NodeStore::new());
        for (i, node) in old.into_nodes().into_iter().enumerate() {
            let old_idx = NodeId::from_index(i + 1);
            if node.is_null() && old_idx != NodeId::ROOT && !self.has_cursor(old_idx) {
                continue;
            }
            let new_idx = self.nodes.push(node);
            mappings[i] = new_idx;
        }

        let len = self.nodes.len();
        for i in 1..=len {
            self.nodes[NodeId::from_index(i)].for_each_live_mut(|_key, target| {
                *target = mappings[target.get() - 1];
            });
        }
        for cursor in self.construction.cursors.iter_mut() {
            *cursor = mappings[cursor.get() - 1];
        }
        log::trace!("remove_blanks: {} -> {} nodes", old_len, len);
    }
}
