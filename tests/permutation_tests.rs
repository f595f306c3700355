use descent::combinator::{attempt, prefix, skip_many, string, token};
use descent::permutation::PermutationParser;
use descent::Parser;

// A modifier keyword that eats its own leading spaces. Wrapped in
// `attempt` so a wrong keyword after consumed spaces backs out cleanly.
fn modifier(word: &'static str) -> impl Parser<char, Output = String> {
    attempt(prefix(skip_many(token(' ')), string(word)))
}

fn mods() -> impl Parser<char, Output = (String, String, String)> {
    PermutationParser::create()
        .add(modifier("pub"))
        .add(modifier("static"))
        .add(modifier("final"))
        .build()
        .map(|((((), a), b), c)| (a, b, c))
}

#[test]
fn accepts_every_order() {
    let inputs = [
        "pub static final",
        "pub final static",
        "static pub final",
        "static final pub",
        "final pub static",
        "final static pub",
    ];
    for input in inputs {
        let (a, b, c) = mods().parse(input).unwrap();
        // Outputs arrive in declaration order, not input order.
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("pub", "static", "final"));
    }
}

#[test]
fn missing_required_item_fails() {
    assert!(mods().parse("pub static").is_err());
    assert!(mods().parse("").is_err());
}

#[test]
fn duplicate_item_is_not_consumed_twice() {
    // The second "pub" matches nothing: each item runs at most once.
    assert!(mods().parse("pub pub final").is_err());
}

#[test]
fn optional_items_fall_back_to_defaults() {
    let p = PermutationParser::create()
        .add(modifier("pub"))
        .add_optional(modifier("static"), String::new())
        .build()
        .map(|(((), vis), stat)| (vis, stat));

    let (vis, stat) = p.parse("pub static").unwrap();
    assert_eq!((vis.as_str(), stat.as_str()), ("pub", "static"));

    let (vis, stat) = p.parse("static pub").unwrap();
    assert_eq!((vis.as_str(), stat.as_str()), ("pub", "static"));

    let (vis, stat) = p.parse("pub").unwrap();
    assert_eq!((vis.as_str(), stat.as_str()), ("pub", ""));
}

#[test]
fn empty_permutation_matches_nothing() {
    let p = PermutationParser::create().build();
    assert_eq!(p.parse("anything").unwrap(), ());
}

#[test]
fn first_added_wins_a_tie() {
    // Both items could match "ab"; the earlier one is tried first.
    let p = PermutationParser::create()
        .add(attempt(string("ab")))
        .add(attempt(string("abc")))
        .build()
        .map(|(((), first), second)| (first, second));

    // "ab" is taken by the first item, leaving "c" which matches neither,
    // so the second (required) item is missing.
    assert!(p.parse("abc").is_err());
}

#[test]
#[should_panic(expected = "without consuming")]
fn non_consuming_item_is_a_usage_error() {
    use descent::combinator::constant;

    let p = PermutationParser::create().add(constant(|| 0)).build();
    let _ = p.parse("x");
}
