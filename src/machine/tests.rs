use super::*;
use pretty_assertions::assert_eq;

fn literal(s: &[u8]) -> Pattern<u8> {
    let mut p = Pattern::new();
    p.match_sequence(s).exit_point();
    p
}

#[test]
fn test_alternation_after_literal() {
    let mut m = Pattern::new();
    m.match_sequence(&['a', 'b'])
        .match_any_of(&['c', 'd'])
        .exit_point();

    assert!(m.is_match(b"abc"), "abc should match ab[cd]");
    assert!(m.is_match(b"abd"), "abd should match ab[cd]");
    assert!(!m.is_match(b"abe"), "abe should not match ab[cd]");
    assert!(!m.is_match(b"ab"), "the alternation is not optional");
}

#[test]
fn test_optional_repetition() {
    let mut a = Pattern::new();
    a.match_any_of(&['a']).exit_point();
    let mut b = Pattern::new();
    b.match_any_of(&['b']).exit_point();

    let mut m = Pattern::new();
    m.match_pattern(&a).match_many_optionally(&b).exit_point();

    assert!(m.is_match(b"a"), "zero repetitions should match");
    assert!(m.is_match(b"ab"), "one repetition should match");
    assert!(m.is_match(b"abb"), "many repetitions should match");
    assert!(!m.is_match(b"b"), "the prefix is mandatory");
}

#[test]
fn test_find_prefers_longest_match() {
    let mut m = Pattern::new();
    m.match_str("if").exit_point();
    m.root().match_str("ifdef").exit_point();

    let found = m.find(b"xxifdefyy").unwrap().expect("ifdef should be found");
    assert_eq!(found.range, 2..7, "the longer alternative wins");

    // the shorter alternative still matches on its own
    let found = m.find(b"xxifyy").unwrap().expect("if should be found");
    assert_eq!(found.range, 2..4);
}

#[test]
fn test_back_by_trims_reported_span() {
    let mut m = Pattern::new();
    m.match_sequence(b"foo").exit_point_back_by(1);

    let found = m.find(b"foo").unwrap().expect("foo should be found");
    assert_eq!(found.range, 0..2, "the final symbol stays unconsumed");
}

#[test]
fn test_utf8_expansion_and_validation() {
    let mut m = Pattern::new();
    m.match_any_of(&['é']).exit_point();

    assert_eq!(m.matches(&[0xC3, 0xA9]).map(|v| v.is_some()), Ok(true));
    assert_eq!(m.matches(&[0xC3]), Err(Utf8Error::TruncatedSequence));
    assert_eq!(m.matches(&[0xA9]), Err(Utf8Error::StrayByte));
}

#[test]
fn test_utf8_mixed_width_alternation() {
    let mut m = Pattern::new();
    m.match_any_of(&['a', 'é', '€']).exit_point();

    assert!(m.is_match("a".as_bytes()));
    assert!(m.is_match("é".as_bytes()));
    assert!(m.is_match("€".as_bytes()));
    assert!(!m.is_match("b".as_bytes()));
}

#[test]
fn test_find_multibyte_needle() {
    let mut m = Pattern::new();
    m.match_any_of(&['é']).exit_point();

    let text = "café!".as_bytes();
    let found = m.find(text).unwrap().expect("é should be found");
    assert_eq!(found.range, 3..5);
}

#[test]
fn test_conflict_overwrite_takes_later_value() {
    let mut m: StateMachine<u32, u8> = StateMachine::new();
    m.conflict(ConflictAction::Overwrite);
    m.match_sequence(b"ab").exit_with(1);
    m.root().match_sequence(b"ab").exit_with(2);

    assert_eq!(m.matches(b"ab"), Ok(Some(&2)));
}

#[test]
fn test_conflict_skip_keeps_earlier_value() {
    let mut m: StateMachine<u32, u8> = StateMachine::new();
    m.conflict(ConflictAction::Skip);
    m.match_sequence(b"ab").exit_with(1);
    m.root().match_sequence(b"ab").exit_with(2);

    assert_eq!(m.matches(b"ab"), Ok(Some(&1)));
}

#[test]
#[should_panic(expected = "conflicting exit points")]
fn test_conflict_error_panics_on_collision() {
    let mut m: StateMachine<u32, u8> = StateMachine::new();
    m.match_sequence(b"ab").exit_with(1);
    m.root().match_sequence(b"ab").exit_with(2);
}

#[test]
#[should_panic(expected = "conflicting default transitions")]
fn test_conflict_error_panics_on_default_collision() {
    let mut m = Pattern::<u8>::new();
    m.match_default();
    m.root().match_default();
}

#[test]
fn test_valued_lookup() {
    let mut m: StateMachine<&'static str, u8> = StateMachine::new();
    m.match_sequence(b"GET").exit_with("get");
    m.root().match_sequence(b"PUT").exit_with("put");

    assert_eq!(m.matches(b"GET"), Ok(Some(&"get")));
    assert_eq!(m.matches(b"PUT"), Ok(Some(&"put")));
    assert_eq!(m.matches(b"POST"), Ok(None));
}

#[test]
fn test_eof_transition() {
    let mut m = Pattern::new();
    m.match_sequence(b"a").match_eof().exit_point();

    assert!(m.matches_with_eof(b"a").unwrap().is_some());
    assert!(m.matches(b"a").unwrap().is_none(), "eof edge is opt-in");
    assert!(m.matches_with_eof(b"ab").unwrap().is_none());
}

#[test]
fn test_match_default_catches_any_symbol() {
    let mut m = Pattern::new();
    m.match_sequence(b"a").match_default().exit_point();

    assert!(m.is_match(b"ab"));
    assert!(m.is_match(b"a?"));
    assert!(!m.is_match(b"a"));
    assert!(!m.is_match(b"abb"), "the default target is a dead end");
}

#[test]
fn test_default_shadows_discreet_writes() {
    // writes through a defaulted cursor go to a fresh successor; the
    // default target itself is left untouched
    let mut m = Pattern::<u8>::new();
    m.match_default();
    m.root().match_any_of(&[b'x']).exit_point();

    assert!(m.is_match(b"x"));
    assert!(!m.is_match(b"y"), "the default target never became accepting");

    // under Skip, a default collision re-adopts the existing target
    m.root()
        .conflict(ConflictAction::Skip)
        .match_default()
        .exit_point();
    assert!(m.is_match(b"y"));
    assert!(m.is_match(b"x"));
}

#[test]
fn test_default_merges_into_existing_key() {
    let mut m = Pattern::<u8>::new();
    m.match_any_of(&[b'x']);
    m.root().match_default();
    m.root().match_any_of(&[b'x']).exit_point();

    assert!(m.is_match(b"x"));
    assert!(!m.is_match(b"y"), "only the x continuation gained the accept");
}

#[test]
fn test_merge_value_conflict_policies() {
    let build = |action: ConflictAction| {
        let mut m: StateMachine<u32, u8> = StateMachine::new();
        m.conflict(action);
        m.match_any_of(&[b'x']).exit_with(1);
        m.root().match_default().exit_with(2);
        m.root().match_any_of(&[b'x']);
        m
    };

    let m = build(ConflictAction::Skip);
    assert_eq!(m.matches(b"x"), Ok(Some(&1)), "skip keeps the x value");

    let m = build(ConflictAction::Overwrite);
    assert_eq!(m.matches(b"x"), Ok(Some(&2)), "overwrite adopts the default value");
    assert_eq!(m.matches(b"y"), Ok(Some(&2)));
}

#[test]
#[should_panic(expected = "conflicting accept values")]
fn test_merge_value_conflict_panics_under_error() {
    let mut m: StateMachine<u32, u8> = StateMachine::new();
    m.match_any_of(&[b'x']).exit_with(1);
    m.root().match_default().exit_with(2);
    m.root().match_any_of(&[b'x']);
}

#[test]
fn test_match_many_requires_one_repetition() {
    let mut p = Pattern::new();
    p.match_sequence(b"ab").exit_point();

    let mut m = Pattern::new();
    m.match_many(&p).exit_point();

    assert!(!m.is_match(b""), "match_many needs at least one repetition");
    assert!(m.is_match(b"ab"));
    assert!(m.is_match(b"abab"));
    assert!(m.is_match(b"ababab"));
    assert!(!m.is_match(b"a"));
    assert!(!m.is_match(b"aba"));
}

#[test]
fn test_match_many_equals_pattern_then_optional() {
    let mut p = Pattern::new();
    p.match_sequence(b"ab").exit_point();

    let mut many = Pattern::new();
    many.match_many(&p).exit_point();

    let mut composed = Pattern::new();
    composed
        .match_pattern(&p)
        .match_many_optionally(&p)
        .exit_point();

    for input in [
        b"".as_slice(),
        b"ab",
        b"abab",
        b"ababab",
        b"a",
        b"aba",
        b"b",
    ] {
        assert_eq!(
            many.is_match(input),
            composed.is_match(input),
            "match_many and match + match_many_optionally disagree on {input:?}"
        );
    }
}

#[test]
fn test_find_many_yields_every_occurrence() {
    let mut m = Pattern::new();
    m.match_sequence(b"ab").exit_point();

    let ranges: Vec<_> = m
        .find_many(b"ab ab ab")
        .map(|r| r.expect("no utf-8 in play").range)
        .collect();
    assert_eq!(
        ranges,
        vec![0..2, 3..5, 6..8],
        "the final match ends exactly at end of input"
    );
}

#[test]
fn test_find_many_agrees_with_repeated_find() {
    let mut m = Pattern::new();
    m.match_sequence(b"ab").exit_point();

    let input = b"xxab--abab".as_slice();
    let from_iter: Vec<_> = m
        .find_many(input)
        .map(|r| r.expect("no utf-8 in play").range)
        .collect();

    let mut from_find = Vec::new();
    let mut offset = 0;
    while let Some(found) = m.find(&input[offset..]).unwrap() {
        if found.range.is_empty() {
            break;
        }
        from_find.push((found.range.start + offset)..(found.range.end + offset));
        offset = from_find.last().map(|r| r.end).unwrap_or(offset);
    }
    assert_eq!(from_iter, from_find);
}

#[test]
fn test_find_scan_does_not_backtrack() {
    // a failed extension restarts after the failing symbol, not inside
    // the abandoned prefix
    let m = literal(b"ab");
    assert!(m.find(b"aab").unwrap().is_none());
    assert_eq!(m.find(b"xab").unwrap().map(|f| f.range), Some(1..3));
}

#[test]
fn test_find_reports_error_even_after_partial_match() {
    let mut m = Pattern::new();
    m.match_any_of(&['a']).exit_point();

    assert_eq!(m.find(&[b'a', 0xA9]), Err(Utf8Error::StrayByte));
}

#[test]
fn test_find_many_stops_at_error() {
    let mut m = Pattern::new();
    m.match_any_of(&['a']).exit_point();

    let results: Vec<_> = m.find_many(&[b'a', 0xA9]).collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().err(), Some(&Utf8Error::StrayByte));
}

#[test]
#[should_panic(expected = "stray utf-8 continuation byte")]
fn test_panic_error_mode() {
    let mut m = Pattern::new();
    m.match_any_of(&['a']).exit_point();
    m.on_match_error(MatchErrorMode::Panic);
    let _ = m.find(&[0xA9]);
}

#[test]
fn test_full_match_implies_full_range_find() {
    let m = literal(b"abc");
    assert!(m.matches(b"abc").unwrap().is_some());
    let found = m.find(b"abc").unwrap().expect("abc should be found");
    assert_eq!(found.range, 0..3);
}

#[test]
fn test_optimize_preserves_behavior() {
    let inputs: &[&[u8]] = &[b"", b"ab", b"abab", b"ababab", b"a", b"aba", b"xx", b"abx"];

    let mut p = Pattern::new();
    p.match_sequence(b"ab").exit_point();
    let mut m = Pattern::new();
    m.match_many(&p).exit_point();

    let before: Vec<bool> = inputs.iter().map(|i| m.is_match(i)).collect();
    let nodes_before = m.node_count();
    m.optimize();
    let after: Vec<bool> = inputs.iter().map(|i| m.is_match(i)).collect();

    assert_eq!(before, after, "optimization must not change match behavior");
    assert!(
        m.node_count() <= nodes_before,
        "optimization should never grow the machine"
    );
}

#[test]
fn test_optimize_folds_shared_tails() {
    let mut m = Pattern::new();
    m.match_sequence(b"ax").exit_point();
    m.root().match_sequence(b"bx").exit_point();
    m.root();

    let before = m.node_count();
    m.optimize();

    assert!(
        m.node_count() < before,
        "the shared x tail should fold ({} -> {})",
        before,
        m.node_count()
    );
    assert!(m.is_match(b"ax"));
    assert!(m.is_match(b"bx"));
    assert!(!m.is_match(b"cx"));
}

#[test]
fn test_optimize_is_idempotent() {
    let inputs: &[&[u8]] = &[b"ax", b"bx", b"x", b"a", b"axx"];

    let mut m = Pattern::new();
    m.match_sequence(b"ax").exit_point();
    m.root().match_sequence(b"bx").exit_point();
    m.root();

    m.optimize();
    let once: Vec<bool> = inputs.iter().map(|i| m.is_match(i)).collect();
    let nodes_once = m.node_count();

    m.optimize();
    let twice: Vec<bool> = inputs.iter().map(|i| m.is_match(i)).collect();

    assert_eq!(once, twice);
    assert_eq!(nodes_once, m.node_count());
}

#[test]
fn test_optimize_keeps_greedy_find() {
    let mut m = Pattern::new();
    m.match_str("if").exit_point();
    m.root().match_str("ifdef").exit_point();
    m.root();
    m.optimize();

    let found = m.find(b"xxifdefyy").unwrap().expect("ifdef should be found");
    assert_eq!(found.range, 2..7);
}

#[test]
fn test_root_is_stable() {
    let mut m = Pattern::new();
    m.match_sequence(b"abc").exit_point();
    m.root().match_sequence(b"abd").exit_point();
    m.root();
    m.optimize();

    assert_eq!(NodeId::ROOT.get(), 1);
    assert!(m.node_count() >= 1);
    assert!(m.is_match(b"abc") && m.is_match(b"abd"));
}

#[test]
fn test_splice_does_not_disturb_existing_pattern() {
    // splicing a sub-pattern over a prefix shared with an existing accept
    // path must leave the existing path intact
    let mut m = Pattern::new();
    m.match_sequence(b"ab").exit_point();

    let mut p = Pattern::new();
    p.match_sequence(b"ac").exit_point();
    m.root().match_pattern(&p).exit_point();

    assert!(m.is_match(b"ab"), "the pre-existing pattern must survive");
    assert!(m.is_match(b"ac"), "the spliced pattern must match");
    assert!(!m.is_match(b"ad"));
}

#[test]
fn test_dump_renders_graph() {
    let mut m = Pattern::new();
    m.match_sequence(b"a").exit_point();

    let dump = m.dump();
    assert!(dump.contains("#1 >>"), "root block missing:\n{dump}");
    assert!(dump.contains("'97' -> #2"), "transition missing:\n{dump}");
    assert!(dump.contains("(terminal val: ())"), "accept missing:\n{dump}");
    assert!(dump.contains("[cursor]"), "cursor marker missing:\n{dump}");
}

#[test]
fn test_generic_alphabet() {
    let mut m: StateMachine<&'static str, u32> = StateMachine::new();
    m.match_sequence(&[10, 20, 30]).exit_with("ten-twenty-thirty");
    m.root().match_sequence(&[10, 99]).exit_with("ten-ninetynine");

    assert_eq!(m.matches(&[10, 20, 30]), Ok(Some(&"ten-twenty-thirty")));
    assert_eq!(m.matches(&[10, 99]), Ok(Some(&"ten-ninetynine")));
    assert_eq!(m.matches(&[10, 20]), Ok(None));
}
