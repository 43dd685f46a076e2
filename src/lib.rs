//! dfsm: incrementally constructed deterministic finite state machines
//!
//! Build a machine by composing literals, alternatives, sub-patterns and
//! repetition; optimize it; then query it with full-input [`matches`],
//! greedy single-occurrence [`find`] or iterative [`find_many`].
//!
//! [`matches`]: StateMachine::matches
//! [`find`]: StateMachine::find
//! [`find_many`]: StateMachine::find_many
//!
//! ```
//! use dfsm::Pattern;
//!
//! // (if|ifdef), longest match wins
//! let mut keywords = Pattern::new();
//! keywords.match_str("if").exit_point();
//! keywords.root().match_str("ifdef").exit_point();
//! keywords.optimize();
//!
//! let found = keywords.find(b"xx ifdef yy").unwrap().unwrap();
//! assert_eq!(found.range, 3..8);
//! ```
//!
//! Machines can carry a value per accepting state; matching hands the value
//! back:
//!
//! ```
//! use dfsm::StateMachine;
//!
//! let mut tokens: StateMachine<u32, u8> = StateMachine::new();
//! tokens.match_sequence(b"let").exit_with(1);
//! tokens.root().match_sequence(b"loop").exit_with(2);
//!
//! assert_eq!(tokens.matches(b"loop"), Ok(Some(&2)));
//! assert_eq!(tokens.matches(b"lo"), Ok(None));
//! ```

mod machine;

pub use machine::{
    Accept, ConflictAction, FindIter, FindMatch, InputValidator, Key, MatchErrorMode, Node, NodeId,
    NodeStore, NullValidator, Pattern, StateMachine, Symbol, ThreadSafeMachine, Utf8Error,
    Utf8Validator,
};
