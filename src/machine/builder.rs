//! Machine construction: cursors, combinators and sub-pattern merging.
//!
//! Building works through a set of cursors, the node indices the next write
//! applies to. Every combinator consumes the current cursor set and leaves
//! the set of nodes reached after its pattern has been written. The
//! nontrivial part is keeping the graph deterministic while patterns are
//! composed: whenever a write would land on a node that is already part of
//! another accepting path, the affected sub-graph is cloned into fresh
//! intermediaries so the older pattern keeps matching exactly what it
//! matched before.

use std::fmt;
use std::marker::PhantomData;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::node::{Accept, Key, Node};
use super::store::{NodeId, NodeStore};
use super::symbol::Symbol;

/// How to resolve a collision on an accept value, a `back_by`, or a default
/// edge during construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ConflictAction {
    /// Keep the pre-existing value.
    Skip,
    /// Replace it with the incoming one.
    Overwrite,
    /// Collect every collision in the call and panic with a diagnostic.
    #[default]
    Error,
}

/// How malformed input surfaces from the match functions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum MatchErrorMode {
    /// Panic with the error message.
    Panic,
    /// Carry the error in the returned `Result`.
    #[default]
    Return,
}

/// Builder-only state: the write frontier and the conflict policy.
#[derive(Clone)]
pub(crate) struct ConstructionState {
    pub(crate) cursors: Vec<NodeId>,
    pub(crate) on_conflict: ConflictAction,
}

impl Default for ConstructionState {
    fn default() -> Self {
        Self {
            cursors: vec![NodeId::ROOT],
            on_conflict: ConflictAction::default(),
        }
    }
}

/// A valueless machine, used as a composable sub-pattern.
pub type Pattern<T> = StateMachine<(), T>;

/// An incrementally constructed deterministic finite state machine.
///
/// `V` is the value handed back on acceptance (`()` for plain patterns),
/// `T` the build-time transition alphabet. Construction methods chain:
///
/// ```
/// use dfsm::Pattern;
///
/// let mut word = Pattern::new();
/// word.match_sequence(&[b'i', b'f']).exit_point();
/// assert!(word.is_match(b"if"));
/// ```
pub struct StateMachine<V, T: Symbol> {
    pub(crate) nodes: NodeStore<V, T::Unit>,
    pub(crate) construction: ConstructionState,
    pub(crate) error_mode: MatchErrorMode,
    _alphabet: PhantomData<fn() -> T>,
}

impl<V: Clone, T: Symbol> Clone for StateMachine<V, T> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            construction: self.construction.clone(),
            error_mode: self.error_mode,
            _alphabet: PhantomData,
        }
    }
}

impl<V, T: Symbol> Default for StateMachine<V, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, T: Symbol> StateMachine<V, T> {
    /// An empty machine: a lone root node, cursors on the root.
    pub fn new() -> Self {
        let mut nodes = NodeStore::new();
        nodes.push(Node::default());
        Self {
            nodes,
            construction: ConstructionState::default(),
            error_mode: MatchErrorMode::default(),
            _alphabet: PhantomData,
        }
    }

    /// Reset the cursors to the root.
    pub fn root(&mut self) -> &mut Self {
        self.construction.cursors = vec![NodeId::ROOT];
        self
    }

    /// Set the conflict policy for subsequent writes.
    pub fn conflict(&mut self, action: ConflictAction) -> &mut Self {
        self.construction.on_conflict = action;
        self
    }

    /// Set how malformed input surfaces from the match functions.
    pub fn on_match_error(&mut self, mode: MatchErrorMode) -> &mut Self {
        self.error_mode = mode;
        self
    }

    /// Number of nodes in the store, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn new_node(&mut self) -> NodeId {
        self.nodes.push(Node::default())
    }

    pub(crate) fn has_cursor(&self, idx: NodeId) -> bool {
        self.construction.cursors.contains(&idx)
    }

    /// Render the graph as text: one block per node with its accept record,
    /// cursor membership and live transitions.
    pub fn dump(&self) -> String
    where
        V: fmt::Debug,
    {
        let mut out = String::new();
        for (idx, node) in self.nodes.iter() {
            out.push_str(&format!("#{}", idx.get()));
            if let Some(accept) = node.accept() {
                if accept.back_by == 0 {
                    out.push_str(&format!(" (terminal val: {:?})", accept.value));
                } else {
                    out.push_str(&format!(
                        " (terminal val: {:?}, back_by: {})",
                        accept.value, accept.back_by
                    ));
                }
            }
            if self.has_cursor(idx) {
                out.push_str(" [cursor]");
            }
            if node.is_null() {
                out.push_str(" NULL");
            }
            out.push_str(" >>\n");
            node.for_each_live(|key, target| {
                out.push_str(&format!(" |  '{}' -> #{}\n", key, target.get()));
            });
            out.push('\n');
        }
        out
    }

    /// Print [`StateMachine::dump`] to stdout.
    pub fn print_dbg(&self)
    where
        V: fmt::Debug,
    {
        print!("{}", self.dump());
    }
}

/// Result of importing a pattern's non-root nodes into another store.
pub(crate) struct ConsumedPattern {
    /// Old pattern index to new store index.
    pub(crate) mappings: FxHashMap<NodeId, NodeId>,
    /// New indices of imported nodes that carried an accept record.
    pub(crate) terminals: Vec<NodeId>,
}

impl<V: Clone, T: Symbol> StateMachine<V, T> {
    /// Advance every cursor along `key`, reusing an existing child where one
    /// is present and sharing a single fresh node among the cursors that
    /// have none.
    ///
    /// Not loop-aware: callers must guarantee the write cannot interact with
    /// pre-existing sub-graphs.
    pub(crate) fn cursor_transition(&mut self, key: Key<T::Unit>) {
        let mut without_child = Vec::new();
        let mut with_child = Vec::new();
        for &cursor in &self.construction.cursors {
            if self.nodes[cursor].transition(key).is_null() {
                without_child.push(cursor);
            } else {
                with_child.push(cursor);
            }
        }

        let mut new_cursors = Vec::new();
        if !without_child.is_empty() {
            let shared = self.new_node();
            new_cursors.push(shared);
            for cursor in without_child {
                self.nodes[cursor].set_transition(key, shared);
            }
        }
        for cursor in with_child {
            new_cursors.push(self.nodes[cursor].transition(key));
        }
        self.construction.cursors = new_cursors;
    }

    /// Advance every cursor along `key` onto a freshly-owned successor, so
    /// later writes at the new cursors cannot leak into unrelated patterns.
    ///
    /// Cursors fall into three groups: no successor and no default (share
    /// one fresh node), an existing successor (clone it per cursor), or a
    /// default edge (fold the default target's semantics into the new
    /// successor).
    pub(crate) fn cursor_discreet_transition(&mut self, key: Key<T::Unit>) {
        let mut without_child = Vec::new();
        let mut with_child = Vec::new();
        let mut with_default = Vec::new();
        for &cursor in &self.construction.cursors {
            let node = &self.nodes[cursor];
            if !node.transition(Key::Default).is_null() {
                with_default.push(cursor);
            } else if node.transition(key).is_null() {
                without_child.push(cursor);
            } else {
                with_child.push(cursor);
            }
        }

        let mut new_cursors = Vec::new();

        if !without_child.is_empty() {
            let shared = self.new_node();
            new_cursors.push(shared);
            for cursor in without_child {
                self.nodes[cursor].set_transition(key, shared);
            }
        }

        for cursor in with_child {
            let old_target = self.nodes[cursor].transition(key);
            let clone = self.nodes[old_target].clone();
            let intermediary = self.nodes.push(clone);

            // A self-loop on this key must keep looping in the clone, or
            // taking the transition twice in a row would fall out of the
            // pattern.
            if self.nodes[old_target].transition(key) == old_target {
                self.nodes[intermediary].set_transition(key, intermediary);
            }

            self.nodes[cursor].set_transition(key, intermediary);
            new_cursors.push(intermediary);
        }

        if !with_default.is_empty() {
            let mut clone_tasks: Vec<(NodeId, NodeId)> = Vec::new();
            for cursor in with_default {
                let existing = self.nodes[cursor].transition(key);
                if !existing.is_null() {
                    let default_target = self.nodes[cursor].transition(Key::Default);
                    let replacements =
                        self.make_nonambiguous_link(cursor, key, default_target, &[default_target]);
                    assert!(
                        !replacements.is_empty(),
                        "no replacement produced for the watched default target"
                    );
                    new_cursors.push(replacements[0]);
                } else {
                    let intermediary = self.new_node();
                    self.nodes[cursor].set_transition(key, intermediary);
                    let default_target = self.nodes[cursor].transition(Key::Default);
                    clone_tasks.push((intermediary, default_target));
                    new_cursors.push(intermediary);
                }
            }

            // Filling the intermediaries is deferred so cross-dependencies
            // between cloned siblings resolve against the final layout.
            for (intermediary, clone_from) in clone_tasks {
                let clone = self.nodes[clone_from].clone();
                self.nodes[intermediary] = clone;
            }
        }

        self.construction.cursors = new_cursors;
    }

    /// Add the semantics of `to`'s sub-graph under `from`'s `key` edge
    /// without mutating `to` or its descendants, cloning intermediaries as
    /// needed. Returns the fresh nodes standing in for any of `watch` (used
    /// to relocate a spliced pattern's terminal set).
    pub(crate) fn make_nonambiguous_link(
        &mut self,
        from: NodeId,
        key: Key<T::Unit>,
        to: NodeId,
        watch: &[NodeId],
    ) -> Vec<NodeId> {
        assert!(!to.is_null(), "tried to link to a null node");
        assert!(!from.is_null(), "tried to link from a null node");

        let current = self.nodes[from].transition(key);

        if current.is_null() {
            self.nodes[from].set_transition(key, to);
            return Vec::new();
        }
        if current == to {
            return Vec::new();
        }

        // Stand-in for the current target: starts as its exact clone with
        // self-references retargeted, then the `to` sub-graph merges in.
        let clone = self.nodes[current].clone();
        let nidx = self.nodes.push(clone);
        self.nodes[nidx].rewrite_references(current, nidx);

        let mut tracked = Vec::new();
        if watch.contains(&to) || watch.contains(&current) {
            tracked.push(nidx);
        }

        if let Some(incoming) = self.nodes[to].accept().cloned() {
            if self.nodes[nidx].accept().is_some() {
                match self.construction.on_conflict {
                    ConflictAction::Error => panic!(
                        "conflicting accept values while linking #{} -> #{} (via '{}')",
                        from.get(),
                        to.get(),
                        key
                    ),
                    ConflictAction::Skip => {}
                    ConflictAction::Overwrite => self.nodes[nidx].set_accept(Some(incoming)),
                }
            } else {
                self.nodes[nidx].set_accept(Some(incoming));
            }
        }

        // Merge the target's slots. The first three cases keep cycles pure:
        // a cycle in either operand must stay a cycle in the fusion, and a
        // null slot in one operand must not become a live edge.
        for (k, reference) in self.nodes[to].entries() {
            let ours = self.nodes[nidx].transition(k);
            if ours == nidx && reference.is_null() {
                self.nodes[nidx].set_transition(k, current);
            } else if reference == to && ours.is_null() {
                self.nodes[nidx].set_transition(k, current);
            } else if reference == to && ours == nidx {
                // both circular, the clone keeps referring to itself
            } else if reference.is_null() {
                // nothing to merge
            } else {
                let nested = self.make_nonambiguous_link(nidx, k, reference, watch);
                tracked.extend(nested);
            }
        }

        self.nodes[from].set_transition(key, nidx);
        tracked
    }

    /// Import every non-root node of `pattern`, rebasing its indices onto
    /// this store. Accept records are not copied; their locations come back
    /// as `terminals`.
    pub(crate) fn consume_pattern_except_root(
        &mut self,
        pattern: &StateMachine<(), T>,
    ) -> ConsumedPattern {
        let mut mappings = FxHashMap::default();
        let mut terminals = Vec::new();
        let base = self.nodes.len() - 1;

        for (old_idx, node) in pattern.nodes.iter() {
            if old_idx == NodeId::ROOT {
                continue;
            }
            if node.accept().is_some() {
                terminals.push(NodeId::from_index(old_idx.get() + base));
            }

            let mut imported: Node<V, T::Unit> = Node::default();
            node.for_each_live(|key, target| {
                imported.set_transition(key, NodeId::from_index(target.get() + base));
            });

            let new_idx = self.nodes.push(imported);
            mappings.insert(old_idx, new_idx);
        }

        ConsumedPattern {
            mappings,
            terminals,
        }
    }

    /// Splice `pattern` at every cursor; the cursor set becomes the spliced
    /// pattern's terminals (including any clones created to resolve
    /// ambiguity with existing transitions).
    pub(crate) fn merge_pattern_into_machine(&mut self, pattern: &StateMachine<(), T>) {
        let base = self.nodes.len() - 1;
        let consumed = self.consume_pattern_except_root(pattern);
        let mut terminals = consumed.terminals;

        // The pattern root's transitions, rebased to the imported nodes.
        let mut pseudo_root: Vec<(Key<T::Unit>, NodeId)> = Vec::new();
        pattern.nodes[NodeId::ROOT].for_each_live(|key, target| {
            pseudo_root.push((key, NodeId::from_index(target.get() + base)));
        });

        let cursors = self.construction.cursors.clone();
        for cursor in cursors {
            for &(key, dest) in &pseudo_root {
                let replacements = self.make_nonambiguous_link(cursor, key, dest, &terminals);
                terminals.extend(replacements);
            }
        }

        self.construction.cursors = terminals;
    }

    /// Advance the cursors over any one of `options`. A `char` alphabet
    /// expands each option into its UTF-8 bytes, one transition per byte.
    pub fn match_any_of(&mut self, options: &[T]) -> &mut Self {
        let initial = self.construction.cursors.clone();
        let mut gathered = Vec::new();
        for &choice in options {
            let mut units: SmallVec<[T::Unit; 4]> = SmallVec::new();
            choice.units(&mut units);
            for &unit in &units {
                self.cursor_discreet_transition(Key::Unit(unit));
            }
            gathered.extend_from_slice(&self.construction.cursors);
            self.construction.cursors = initial.clone();
        }
        self.construction.cursors = gathered;
        self
    }

    /// Advance the cursors over the whole sequence.
    pub fn match_sequence(&mut self, seq: &[T]) -> &mut Self {
        for &part in seq {
            self.match_any_of(&[part]);
        }
        self
    }

    /// Add a default edge from every cursor; the cursors move to the
    /// default targets.
    pub fn match_default(&mut self) -> &mut Self {
        let default_idx = self.new_node();
        let mut new_cursors = vec![default_idx];
        let mut errors = Vec::new();

        let cursors = self.construction.cursors.clone();
        for cursor in cursors {
            let existing = self.nodes[cursor].transition(Key::Default);
            if existing.is_null() {
                self.nodes[cursor].set_transition(Key::Default, default_idx);
            } else {
                match self.construction.on_conflict {
                    ConflictAction::Skip => new_cursors.push(existing),
                    ConflictAction::Overwrite => {
                        self.nodes[cursor].set_transition(Key::Default, default_idx);
                    }
                    ConflictAction::Error => errors.push(format!(
                        "node #{}: existing default #{} would be replaced by #{}",
                        cursor.get(),
                        existing.get(),
                        default_idx.get()
                    )),
                }
            }
        }

        if !errors.is_empty() {
            panic!(
                "conflicting default transitions:\n{}\nresolve by making the \
                 machines nonambiguous or by changing the conflict policy",
                errors.join("\n")
            );
        }
        self.construction.cursors = new_cursors;
        self
    }

    /// Add an end-of-input edge from every cursor.
    pub fn match_eof(&mut self) -> &mut Self {
        self.cursor_transition(Key::Eof);
        self
    }

    /// Splice `pattern` at the cursors.
    pub fn match_pattern(&mut self, pattern: &StateMachine<(), T>) -> &mut Self {
        self.merge_pattern_into_machine(pattern);
        self
    }

    /// Splice one or more repetitions of `pattern`.
    pub fn match_many(&mut self, pattern: &StateMachine<(), T>) -> &mut Self {
        self.match_pattern(pattern).match_many_optionally(pattern)
    }

    /// Splice zero or more repetitions of `pattern`: the spliced terminals
    /// are wired back onto the pattern's entry transitions to form a cycle,
    /// and the pre-splice cursors stay current so zero repetitions match.
    pub fn match_many_optionally(&mut self, pattern: &StateMachine<(), T>) -> &mut Self {
        let cursors_before = self.construction.cursors.clone();
        let consumed = self.consume_pattern_except_root(pattern);

        let mut entry_links: Vec<(Key<T::Unit>, NodeId)> = Vec::new();
        pattern.nodes[NodeId::ROOT].for_each_live(|key, target| {
            let rebased = consumed
                .mappings
                .get(&target)
                .copied()
                .unwrap_or(NodeId::NULL);
            entry_links.push((key, rebased));
        });

        // Close the cycle: every terminal re-enters the pattern the way the
        // root did.
        for &(key, dest) in &entry_links {
            for &terminal in &consumed.terminals {
                self.make_nonambiguous_link(terminal, key, dest, &[]);
            }
        }

        // Open the cycle up to the pre-splice cursors.
        for &(key, dest) in &entry_links {
            for &cursor in &cursors_before {
                self.make_nonambiguous_link(cursor, key, dest, &[]);
            }
        }

        self.construction.cursors = cursors_before;
        self.construction
            .cursors
            .extend_from_slice(&consumed.terminals);
        self
    }
}

impl<V: Clone + PartialEq, T: Symbol> StateMachine<V, T> {
    /// Mark every cursor as accepting with `value`.
    pub fn exit_with(&mut self, value: V) -> &mut Self {
        self.exit_with_back_by(value, 0)
    }

    /// Mark every cursor as accepting with `value`, leaving the final
    /// `back_by` input symbols unconsumed when `find` reports the match.
    pub fn exit_with_back_by(&mut self, value: V, back_by: u32) -> &mut Self {
        let mut errors = Vec::new();

        let cursors = self.construction.cursors.clone();
        for cursor in cursors {
            let existing = match self.nodes[cursor].accept() {
                None => {
                    self.nodes[cursor].set_accept(Some(Accept {
                        value: value.clone(),
                        back_by,
                    }));
                    continue;
                }
                Some(accept) => (accept.value == value && accept.back_by == back_by, accept.back_by),
            };
            let (unchanged, old_back_by) = existing;
            if unchanged {
                continue;
            }
            match self.construction.on_conflict {
                ConflictAction::Skip => {}
                ConflictAction::Overwrite => {
                    self.nodes[cursor].set_accept(Some(Accept {
                        value: value.clone(),
                        back_by,
                    }));
                }
                ConflictAction::Error => errors.push(format!(
                    "node #{}: existing accept (back_by {}) would be replaced (back_by {})",
                    cursor.get(),
                    old_back_by,
                    back_by
                )),
            }
        }

        if !errors.is_empty() {
            panic!(
                "conflicting exit points:\n{}\nresolve by making the machines \
                 nonambiguous or by changing the conflict policy",
                errors.join("\n")
            );
        }
        self
    }
}

impl<T: Symbol> StateMachine<(), T> {
    /// Mark every cursor as accepting.
    pub fn exit_point(&mut self) -> &mut Self {
        self.exit_with(())
    }

    /// Mark every cursor as accepting, leaving the final `back_by` input
    /// symbols unconsumed when `find` reports the match.
    pub fn exit_point_back_by(&mut self, back_by: u32) -> &mut Self {
        self.exit_with_back_by((), back_by)
    }
}

impl<V: Clone> StateMachine<V, char> {
    /// Advance the cursors over every character of `s` in order.
    pub fn match_str(&mut self, s: &str) -> &mut Self {
        for ch in s.chars() {
            self.match_any_of(&[ch]);
        }
        self
    }
}
