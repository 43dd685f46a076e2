//! Matching against a built machine.
//!
//! All functions here take the machine by shared reference and never mutate
//! it; a machine that is done building can be queried from many readers.

use std::ops::Range;

use super::node::Key;
use super::store::NodeId;
use super::symbol::{InputValidator, Symbol};
use super::utf8::Utf8Error;
use super::{MatchErrorMode, StateMachine};

/// A located occurrence of the machine's pattern, as reported by `find`.
#[derive(Debug, PartialEq)]
pub struct FindMatch<'m, V> {
    /// Positions of the occurrence within the scanned input.
    pub range: Range<usize>,
    /// The accept value of the most specific matched state.
    pub value: &'m V,
}

impl<V> Clone for FindMatch<'_, V> {
    fn clone(&self) -> Self {
        FindMatch {
            range: self.range.clone(),
            value: self.value,
        }
    }
}

impl<V, T: Symbol> StateMachine<V, T> {
    fn raise(&self, err: Utf8Error) -> Utf8Error {
        if self.error_mode == MatchErrorMode::Panic {
            panic!("{err}");
        }
        err
    }

    /// Locate the first occurrence of the pattern, greedily extending it to
    /// the longest acceptable span before yielding.
    ///
    /// Returns `Ok(None)` when the input holds no occurrence; malformed
    /// input surfaces per the machine's [`MatchErrorMode`].
    pub fn find(&self, input: &[T::Unit]) -> Result<Option<FindMatch<'_, V>>, Utf8Error> {
        let mut current = NodeId::ROOT;
        let mut most_specific = NodeId::NULL;
        let mut match_begin = 0usize;
        let mut match_end = 0usize;
        let mut validator = T::Validator::default();

        for (i, &unit) in input.iter().enumerate() {
            if let Err(err) = validator.step(unit) {
                return Err(self.raise(err));
            }

            let next = self.nodes[current].step(unit);
            if !next.is_null() {
                current = next;
                if self.nodes[current].accept().is_some() {
                    most_specific = current;
                    match_end = i + 1;
                }
            } else if most_specific.is_null() {
                // nothing matched yet, restart from scratch past this unit
                current = NodeId::ROOT;
                match_begin = i + 1;
                match_end = i + 1;
            } else {
                // the remembered match cannot grow any further
                break;
            }
        }

        if let Err(err) = validator.finish() {
            return Err(self.raise(err));
        }

        if most_specific.is_null() {
            return Ok(None);
        }
        let accept = match self.nodes[most_specific].accept() {
            Some(accept) => accept,
            None => return Ok(None),
        };
        let end = match_end
            .saturating_sub(accept.back_by as usize)
            .max(match_begin);
        Ok(Some(FindMatch {
            range: match_begin..end,
            value: &accept.value,
        }))
    }

    /// Test whether the entire input matches, yielding the accept value.
    ///
    /// End-of-input edges are not consulted and `back_by` has no effect.
    pub fn matches(&self, input: &[T::Unit]) -> Result<Option<&V>, Utf8Error> {
        self.matches_inner(input, false)
    }

    /// Like [`StateMachine::matches`], but the machine must additionally
    /// take an end-of-input transition after the last unit.
    pub fn matches_with_eof(&self, input: &[T::Unit]) -> Result<Option<&V>, Utf8Error> {
        self.matches_inner(input, true)
    }

    /// Whether the entire input matches. Malformed input counts as no
    /// match under [`MatchErrorMode::Return`].
    pub fn is_match(&self, input: &[T::Unit]) -> bool {
        self.matches(input).map_or(false, |m| m.is_some())
    }

    fn matches_inner(&self, input: &[T::Unit], include_eof: bool) -> Result<Option<&V>, Utf8Error> {
        let mut current = NodeId::ROOT;
        let mut validator = T::Validator::default();

        for &unit in input {
            if let Err(err) = validator.step(unit) {
                return Err(self.raise(err));
            }
            let next = self.nodes[current].step(unit);
            if next.is_null() {
                return Ok(None);
            }
            current = next;
        }

        if let Err(err) = validator.finish() {
            return Err(self.raise(err));
        }

        if include_eof {
            let eof = self.nodes[current].transition(Key::Eof);
            if eof.is_null() {
                return Ok(None);
            }
            current = eof;
        }

        Ok(self.nodes[current].accept().map(|accept| &accept.value))
    }

    /// Iterate every occurrence of the pattern, each scan starting where
    /// the previous match ended.
    pub fn find_many<'m, 'i>(&'m self, input: &'i [T::Unit]) -> FindIter<'m, 'i, V, T> {
        FindIter {
            machine: self,
            input,
            offset: 0,
            done: false,
        }
    }
}

/// Lazy iterator over non-overlapping `find` results.
///
/// Ends at the first scan that yields no match or an empty range (the
/// latter can happen when `back_by` swallows a whole match).
pub struct FindIter<'m, 'i, V, T: Symbol> {
    machine: &'m StateMachine<V, T>,
    input: &'i [T::Unit],
    offset: usize,
    done: bool,
}

impl<'m, 'i, V, T: Symbol> Iterator for FindIter<'m, 'i, V, T> {
    type Item = Result<FindMatch<'m, V>, Utf8Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.machine.find(&self.input[self.offset..]) {
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Ok(Some(found)) => {
                if found.range.is_empty() {
                    self.done = true;
                    return None;
                }
                let range = (found.range.start + self.offset)..(found.range.end + self.offset);
                self.offset = range.end;
                Some(Ok(FindMatch {
                    range,
                    value: found.value,
                }))
            }
        }
    }
}
