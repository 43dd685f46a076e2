//! Shared build/match access to a machine.
//!
//! The core builder is single-threaded. This wrapper pairs a mutable
//! builder behind a mutex with a frozen snapshot published through an
//! atomic pointer swap: readers match against the snapshot without taking
//! any lock, writers rebuild under the mutex and publish a fresh clone.
//! Readers holding an older snapshot keep it alive until they drop it.

use std::ops::Range;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::symbol::Symbol;
use super::utf8::Utf8Error;
use super::StateMachine;

pub struct ThreadSafeMachine<V, T: Symbol> {
    frozen: ArcSwap<StateMachine<V, T>>,
    builder: Mutex<StateMachine<V, T>>,
}

impl<V: Clone + PartialEq, T: Symbol> Default for ThreadSafeMachine<V, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq, T: Symbol> ThreadSafeMachine<V, T> {
    pub fn new() -> Self {
        let machine = StateMachine::new();
        Self {
            frozen: ArcSwap::from_pointee(machine.clone()),
            builder: Mutex::new(machine),
        }
    }

    /// Mutate the builder and publish the result. Readers see the previous
    /// snapshot until this returns.
    pub fn update(&self, build: impl FnOnce(&mut StateMachine<V, T>)) {
        let mut builder = self.builder.lock();
        build(&mut builder);
        log::debug!(
            "publishing rebuilt machine with {} nodes",
            builder.node_count()
        );
        self.frozen.store(Arc::new(builder.clone()));
    }

    /// The current frozen machine. The returned handle stays valid across
    /// later updates.
    pub fn snapshot(&self) -> Arc<StateMachine<V, T>> {
        self.frozen.load_full()
    }

    /// Whether the entire input matches the current snapshot.
    pub fn is_match(&self, input: &[T::Unit]) -> bool {
        self.frozen.load().is_match(input)
    }

    /// Full-input match against the current snapshot, cloning the value out.
    pub fn matches(&self, input: &[T::Unit]) -> Result<Option<V>, Utf8Error> {
        self.frozen.load().matches(input).map(|m| m.cloned())
    }

    /// First occurrence in `input` per the current snapshot, cloning the
    /// value out.
    pub fn find(&self, input: &[T::Unit]) -> Result<Option<(Range<usize>, V)>, Utf8Error> {
        self.frozen
            .load()
            .find(input)
            .map(|m| m.map(|found| (found.range, found.value.clone())))
    }
}
