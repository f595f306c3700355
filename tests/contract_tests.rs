//! The universal laws of the consumption contract, checked observably.

use descent::combinator::{
    any, attempt, constant, current_offset, either, look_ahead, many, many1, map, opt, pair,
    prefix, satisfy, skip_many, skip_many1, string, suffix, token,
};
use descent::Parser;

#[test]
fn zero_consumption_failure_reaches_the_next_alternative() {
    // token('a') fails on "b" without consuming, so the second branch
    // must run from the same location.
    let p = pair(either(token('a'), current_offset().with_value('?')), any());
    assert_eq!(p.parse("b").unwrap(), ('?', 'b'));
}

#[test]
fn committed_failure_skips_the_next_alternative() {
    // The first branch consumes 'a' before dying, which must prevent the
    // second branch from running at all.
    let p = either(string("ab"), string("ax"));
    let err = p.parse("ax").unwrap_err();
    assert_eq!(err.expected(), &[descent::Expected::tokens(vec!['a', 'b'])]);
}

#[test]
fn attempt_backtracks_on_failure() {
    let p = pair(opt(attempt(string("ab"))), current_offset());
    assert_eq!(p.parse("ax").unwrap(), (None, 0));
}

#[test]
fn attempt_commits_on_success() {
    let p = pair(attempt(string("ab")), current_offset());
    assert_eq!(p.parse("ab").unwrap(), ("ab".to_owned(), 2));
}

#[test]
fn look_ahead_succeeds_without_progress() {
    let p = pair(look_ahead(string("ab")), current_offset());
    assert_eq!(p.parse("ab").unwrap(), ("ab".to_owned(), 0));
}

#[test]
fn look_ahead_failure_keeps_consumption() {
    let p = opt(look_ahead(string("ab")));
    assert!(p.parse("ax").is_err());
}

#[test]
fn map_identity_is_invisible() {
    let plain = string("food");
    let mapped = map(string("food"), |s| s);
    assert_eq!(plain.parse("food").unwrap(), mapped.parse("food").unwrap());
    assert_eq!(
        plain.parse("foul").unwrap_err(),
        mapped.parse("foul").unwrap_err()
    );
}

#[test]
fn constant_is_neutral_in_sequences() {
    let plain = string("ab");
    let padded = prefix(constant(|| ()), suffix(string("ab"), constant(|| ())));
    assert_eq!(plain.parse("ab").unwrap(), padded.parse("ab").unwrap());
    assert_eq!(
        plain.parse("ax").unwrap_err(),
        padded.parse("ax").unwrap_err()
    );
}

#[test]
fn alternation_is_associative() {
    let a = || token('a');
    let b = || token('b');
    let c = || token('c');
    let left = either(either(a(), b()), c());
    let right = either(a(), either(b(), c()));

    assert_eq!(left.parse("b").unwrap(), right.parse("b").unwrap());
    // Expectation sets compare as multisets, so grouping is invisible in
    // the errors too.
    assert_eq!(left.parse("z").unwrap_err(), right.parse("z").unwrap_err());
}

#[test]
fn sequence_prefix_commitment() {
    // A literal failing at index i leaves exactly i tokens consumed.
    let p = pair(opt(attempt(string("abcd"))), current_offset());
    assert_eq!(p.parse("abxx").unwrap(), (None, 0));

    let err = string("abcd").parse("abxx").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'x'));
    assert_eq!(err.position().col, 3);
}

#[test]
#[should_panic(expected = "without consuming")]
fn many_rejects_non_consuming_success() {
    let _ = many(constant(|| 0)).parse("abc");
}

#[test]
#[should_panic(expected = "without consuming")]
fn many1_rejects_non_consuming_success() {
    let _ = many1(constant(|| 0)).parse("abc");
}

#[test]
#[should_panic(expected = "without consuming")]
fn skip_many_rejects_non_consuming_success() {
    let _ = skip_many(constant(|| 0)).parse("abc");
}

#[test]
#[should_panic(expected = "without consuming")]
fn skip_many1_rejects_non_consuming_success() {
    let _ = skip_many1(constant(|| 0)).parse("abc");
}

#[test]
#[should_panic(expected = "without consuming")]
fn many_rejects_non_consuming_success_mid_stream() {
    // The guard fires on the first non-consuming iteration, not just the
    // first one overall.
    let sometimes = either(token('a'), constant(|| 'z'));
    let _ = many(sometimes).parse("aab");
}

#[test]
fn parsers_are_reusable_values() {
    let p = many1(satisfy(|c: &char| c.is_ascii_lowercase()));
    for _ in 0..3 {
        assert_eq!(p.parse("abc").unwrap(), vec!['a', 'b', 'c']);
    }
}

#[test]
fn parsers_are_shareable_across_threads() {
    use std::sync::Arc;

    let p = Arc::new(many1(satisfy(|c: &char| c.is_ascii_digit())));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let p = Arc::clone(&p);
            std::thread::spawn(move || {
                let input = format!("{i}{i}");
                p.parse(&input).unwrap().len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
}
