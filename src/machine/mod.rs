//! Incremental construction and matching of deterministic finite state
//! machines.
//!
//! A machine is a graph of nodes held in an index-addressed arena. Patterns
//! are written through a set of cursors (current write positions) by a
//! small combinator surface; merging keeps the graph deterministic by
//! cloning any sub-graph a write would otherwise alias. The key components:
//!
//! - `Node` / `NodeStore`: one state and the arena holding them
//! - `StateMachine`: cursors, combinators and sub-pattern merging
//! - the optimizer: duplicate folding, orphan removal, store compaction
//! - the runtime: `matches`, `find`, `find_many`
//!
//! # Module Organization
//!
//! - `store`: `NodeId` and the append-only node arena
//! - `node`: transition maps, accept records
//! - `symbol`: the build-alphabet / runtime-alphabet seam
//! - `utf8`: streaming UTF-8 validation for `char` machines
//! - `builder`: construction state, cursor primitives, combinators
//! - `optimizer`: the canonicalization passes
//! - `runtime`: match functions over a frozen machine
//! - `thread_safe`: lock-free readers over a mutex-guarded builder

mod builder;
mod node;
mod optimizer;
mod runtime;
mod store;
mod symbol;
mod thread_safe;
mod utf8;

// Re-export from builder
pub use builder::{ConflictAction, MatchErrorMode, Pattern, StateMachine};

// Re-export from node
pub use node::{Accept, Key, Node};

// Re-export from runtime
pub use runtime::{FindIter, FindMatch};

// Re-export from store
pub use store::{NodeId, NodeStore};

// Re-export from symbol
pub use symbol::{InputValidator, NullValidator, Symbol};

// Re-export from thread_safe
pub use thread_safe::ThreadSafeMachine;

// Re-export from utf8
pub use utf8::{Utf8Error, Utf8Validator};

#[cfg(test)]
mod tests;
