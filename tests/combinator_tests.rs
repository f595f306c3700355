use descent::combinator::{
    any, attempt, bind, constant, current_offset, delimited, either, end, fail, look_ahead, many,
    many1, many_until, not, one_of, opt, pair, prefix, rec, repeat_string, repeated, satisfy,
    sep_by, sep_by1, sep_end_by, sep_end_by1, seq, skip_many, string, string_ci, suffix, token,
    verbatim, with_default,
};
use descent::{iter_tokens, BoxParser, Expected, Parser};

fn digit() -> impl Parser<char, Output = char> {
    satisfy(|c: &char| c.is_ascii_digit()).labelled("digit")
}

#[test]
fn constant_produces_without_consuming() {
    let p = pair(constant(|| 7), current_offset());
    assert_eq!(p.parse("abc").unwrap(), (7, 0));
}

#[test]
fn fail_reports_message() {
    let err = fail::<char, char, _>("bad input").parse("x").unwrap_err();
    assert_eq!(err.message(), Some("bad input"));
    assert!(!err.at_eof());
}

#[test]
fn any_takes_one_token() {
    assert_eq!(any().parse("xyz").unwrap(), 'x');
    let err = any::<char>().parse("").unwrap_err();
    assert!(err.at_eof());
    assert_eq!(err.expected(), &[Expected::label("any token")]);
}

#[test]
fn token_matches_and_reports() {
    assert_eq!(token('a').parse("ab").unwrap(), 'a');
    let err = token('a').parse("ba").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'b'));
    assert_eq!(err.expected(), &[Expected::tokens(vec!['a'])]);
    assert_eq!(err.position().col, 1);
}

#[test]
fn token_at_eof() {
    let err = token('a').parse("").unwrap_err();
    assert!(err.at_eof());
    assert_eq!(err.unexpected(), None);
}

#[test]
fn satisfy_with_label() {
    assert_eq!(digit().parse("5").unwrap(), '5');
    let err = digit().parse("x").unwrap_err();
    assert_eq!(err.expected(), &[Expected::label("digit")]);
}

#[test]
fn verbatim_over_bytes() {
    let magic = verbatim(vec![0xCAu8, 0xFE]);
    assert!(magic.parse(&[0xCA, 0xFE, 0x01][..]).is_ok());
    let err = magic.parse(&[0xCA, 0x01][..]).unwrap_err();
    assert_eq!(err.unexpected(), Some(&0x01));
    assert_eq!(err.expected(), &[Expected::tokens(vec![0xCAu8, 0xFE])]);
}

#[test]
fn string_produces_matched_text() {
    assert_eq!(string("let").parse("let x").unwrap(), "let");
}

#[test]
fn string_ci_ignores_case() {
    assert_eq!(string_ci("select").parse("SELECT *").unwrap(), "select");
    assert!(string_ci("select").parse("sele*t").is_err());
}

#[test]
fn end_rejects_leftovers() {
    assert!(end::<char>().parse("").is_ok());
    let err = suffix(any(), end()).parse("xy").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'y'));
    assert_eq!(err.expected(), &[Expected::eof()]);
}

#[test]
fn sequencing_keeps_the_right_sides() {
    assert_eq!(prefix(token('#'), any()).parse("#x").unwrap(), 'x');
    assert_eq!(suffix(any(), token(';')).parse("x;").unwrap(), 'x');
    assert_eq!(
        delimited(token('('), any(), token(')')).parse("(x)").unwrap(),
        'x'
    );
}

#[test]
fn seq_macro_flattens() {
    let p = seq!(any(), any(), any(), any());
    assert_eq!(p.parse("abcd").unwrap(), ('a', 'b', 'c', 'd'));
}

#[test]
fn bind_threads_context() {
    let doubled = bind(any(), |c| token(c));
    assert_eq!(doubled.parse("aa").unwrap(), 'a');
    let err = doubled.parse("ab").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'b'));
    assert_eq!(err.expected(), &[Expected::tokens(vec!['a'])]);
    assert_eq!(err.position().col, 2);
}

#[test]
fn alternation_without_backtracking() {
    let p = string("food").or(string("foul"));
    let err = p.parse("foul").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'u'));
    assert_eq!(err.position().col, 3);
    assert_eq!(err.expected(), &[Expected::tokens(vec!['f', 'o', 'o', 'd'])]);
}

#[test]
fn alternation_with_attempt() {
    let p = attempt(string("food")).or(string("foul"));
    assert_eq!(p.parse("foul").unwrap(), "foul");
    assert_eq!(p.parse("food").unwrap(), "food");
}

#[test]
fn alternation_merges_expectations() {
    let p = either(token('a'), token('b'));
    let err = p.parse("z").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'z'));
    let expected = err.expected();
    assert_eq!(expected.len(), 2);
    assert!(expected.contains(&Expected::tokens(vec!['a'])));
    assert!(expected.contains(&Expected::tokens(vec!['b'])));
}

#[test]
fn one_of_tries_in_order() {
    let sign = one_of([token('+'), token('-'), token('~')]);
    assert_eq!(sign.parse("-x").unwrap(), '-');
    let err = sign.parse("x").unwrap_err();
    assert_eq!(err.expected().len(), 3);
}

#[test]
fn nested_parens_through_rec() {
    fn expr() -> BoxParser<char, char> {
        satisfy(|c: &char| c.is_ascii_digit())
            .or(delimited(token('('), rec(expr), token(')')))
            .boxed()
    }

    assert_eq!(expr().parse("1").unwrap(), '1');
    assert_eq!(expr().parse("(1)").unwrap(), '1');
    assert_eq!(expr().parse("(((1)))").unwrap(), '1');

    let err = expr().parse("(1").unwrap_err();
    assert!(err.at_eof());
    assert_eq!(err.position().col, 3);
    assert_eq!(err.expected(), &[Expected::tokens(vec![')'])]);
}

#[test]
fn not_rejects_match() {
    let unquoted = prefix(not(token('"')), any());
    assert_eq!(unquoted.parse("x").unwrap(), 'x');
    let err = unquoted.parse("\"rest").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'"'));
}

#[test]
fn opt_swallows_clean_failures_only() {
    assert_eq!(opt(token('a')).parse("b").unwrap(), None);
    assert_eq!(opt(token('a')).parse("a").unwrap(), Some('a'));
    // A failure that consumed input still propagates.
    assert!(opt(string("ab")).parse("ax").is_err());
}

#[test]
fn many_collects_in_order() {
    let digits = many(digit());
    assert_eq!(digits.parse("123x").unwrap(), vec!['1', '2', '3']);
    assert_eq!(digits.parse("x").unwrap(), Vec::<char>::new());
}

#[test]
fn many1_requires_one() {
    let digits = many1(digit());
    assert_eq!(digits.parse("42").unwrap(), vec!['4', '2']);
    let err = digits.parse("x").unwrap_err();
    assert_eq!(err.expected(), &[Expected::label("digit")]);
}

#[test]
fn repetition_commits_on_consuming_failure() {
    // Each item is two tokens; an item broken off half-way fails the
    // whole repetition rather than ending it.
    let items = many(string("ab"));
    assert_eq!(items.parse("ababx").unwrap().len(), 2);
    assert!(items.parse("abax").is_err());
}

#[test]
fn skip_many_discards() {
    let p = prefix(skip_many(token(' ')), any());
    assert_eq!(p.parse("   x").unwrap(), 'x');
    assert_eq!(p.parse("x").unwrap(), 'x');
}

#[test]
fn repeated_runs_exactly_n() {
    assert_eq!(repeated(any(), 3).parse("abcd").unwrap(), vec!['a', 'b', 'c']);
    assert_eq!(repeated(any(), 0).parse("").unwrap(), Vec::<char>::new());
    assert!(repeated(any(), 3).parse("ab").is_err());
}

#[test]
fn repeat_string_packs_chars() {
    assert_eq!(repeat_string(any(), 4).parse("beefsteak").unwrap(), "beef");
}

#[test]
fn many_until_stops_at_terminator() {
    let comment = many_until(any(), string("*/"));
    let (body, close) = comment.parse("hi*/rest").unwrap();
    assert_eq!(body, vec!['h', 'i']);
    assert_eq!(close, "*/");
}

#[test]
fn many_until_merges_both_expectation_sets() {
    let p = many_until(digit(), token(';'));
    let err = p.parse("12x").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'x'));
    let expected = err.expected();
    assert!(expected.contains(&Expected::label("digit")));
    assert!(expected.contains(&Expected::tokens(vec![';'])));
}

#[test]
fn many_until_commits_on_consumed_terminator() {
    let p = many_until(any(), string("*/"));
    // The terminator matches '*' and then dies, committing the failure.
    let err = p.parse("ab*x").unwrap_err();
    assert_eq!(err.unexpected(), Some(&'x'));
    assert_eq!(err.expected(), &[Expected::tokens(vec!['*', '/'])]);
}

#[test]
fn sep_by_families() {
    let list = sep_by1(digit(), token(','));
    assert_eq!(list.parse("1,2,3").unwrap(), vec!['1', '2', '3']);
    assert_eq!(list.parse("1").unwrap(), vec!['1']);
    assert!(list.parse("x").is_err());
    // A separator with nothing after it commits the failure.
    assert!(list.parse("1,2,").is_err());

    let list = sep_by(digit(), token(','));
    assert_eq!(list.parse("").unwrap(), Vec::<char>::new());
    assert_eq!(list.parse("7,8").unwrap(), vec!['7', '8']);

    let trailing = sep_end_by1(digit(), token(','));
    assert_eq!(trailing.parse("1,2,").unwrap(), vec!['1', '2']);
    assert_eq!(trailing.parse("1,2").unwrap(), vec!['1', '2']);

    let trailing = sep_end_by(digit(), token(','));
    assert_eq!(trailing.parse("").unwrap(), Vec::<char>::new());
    assert_eq!(trailing.parse("9,").unwrap(), vec!['9']);
}

#[test]
fn labelled_applies_at_the_choice_point_only() {
    let word = string("while").labelled("keyword");
    // Nothing consumed: the label stands in for the expectations.
    let err = word.parse("xyz").unwrap_err();
    assert_eq!(err.expected(), &[Expected::label("keyword")]);
    // Consumed input: the precise expectations come through.
    let err = word.parse("whale").unwrap_err();
    assert_eq!(
        err.expected(),
        &[Expected::tokens("while".chars().collect::<Vec<_>>())]
    );
}

#[test]
fn verify_rejects_after_the_fact() {
    let even = any()
        .map(|c: char| c as u32)
        .verify_with(|n| n % 2 == 0, |n| format!("odd code point {n}"));
    assert!(even.parse("b").is_ok());
    let err = even.parse("a").unwrap_err();
    assert_eq!(err.message(), Some("odd code point 97"));
    assert_eq!(err.expected(), &[Expected::label("result satisfying assertion")]);
}

#[test]
fn recover_with_resumes_from_failure_point() {
    let digit = satisfy(|c: &char| c.is_ascii_digit());
    let resilient = digit.recover_with(|_err| many_until(any(), token(';')).map(|_| '0'));
    assert_eq!(resilient.parse("7").unwrap(), '7');
    assert_eq!(resilient.parse("oops;").unwrap(), '0');
    // The recovery parser's own failure propagates.
    assert!(resilient.parse("oops").is_err());
}

#[test]
fn recover_with_sees_the_structured_error() {
    let p = token('a').recover_with(|err| {
        assert_eq!(err.unexpected(), Some(&'z'));
        assert_eq!(err.expected(), &[Expected::tokens(vec!['a'])]);
        any()
    });
    assert_eq!(p.parse("z").unwrap(), 'z');
}

#[test]
fn with_default_substitutes_the_default_value() {
    let zero = with_default::<_, _, u32>(token('a'));
    assert_eq!(zero.parse("a").unwrap(), 0);
    assert!(zero.parse("b").is_err());

    let empty: String = string("null").with_default().parse("null rest").unwrap();
    assert!(empty.is_empty());
}

#[test]
fn trace_is_transparent() {
    let p = token('a').trace("letter a");
    assert_eq!(p.parse("a").unwrap(), 'a');
    assert!(p.parse("b").is_err());
}

#[test]
fn parses_non_char_token_streams() {
    #[derive(Debug, Clone, PartialEq)]
    enum Tok {
        LParen,
        RParen,
        Num(i64),
    }

    let p = delimited(
        token(Tok::LParen),
        satisfy(|t: &Tok| matches!(t, Tok::Num(_))),
        token(Tok::RParen),
    );
    let input = vec![Tok::LParen, Tok::Num(3), Tok::RParen];
    assert_eq!(p.parse(iter_tokens(input.into_iter())).unwrap(), Tok::Num(3));
}

#[test]
fn look_ahead_then_reparse() {
    // Peek at a keyword, then actually consume it.
    let p = pair(look_ahead(string("if")), string("if"));
    assert_eq!(p.parse("if").unwrap(), ("if".to_owned(), "if".to_owned()));
}

#[test]
fn error_rendering() {
    let err = string("food").or(string("foul")).parse("foul").unwrap_err();
    assert_eq!(
        format!("{err}"),
        "Parse error.\n    unexpected \"u\"\n    expected \"food\"\n    at line 1, col 3"
    );

    let err = token('a').parse("").unwrap_err();
    assert_eq!(
        format!("{err}"),
        "Parse error.\n    unexpected end of input\n    expected \"a\"\n    at line 1, col 1"
    );

    let err = either(token('a'), token('b')).parse("z").unwrap_err();
    assert_eq!(
        format!("{err}"),
        "Parse error.\n    unexpected \"z\"\n    expected \"a\", or \"b\"\n    at line 1, col 1"
    );
}
