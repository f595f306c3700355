//! Generic parser and combinator building blocks.
//!
//! This module provides the primitives and combinators most parsers are
//! assembled from: token matching, sequencing, alternation, repetition,
//! lookahead, recursion, and recovery. Everything here works for any token
//! type; character-specific conveniences ([`string`], [`string_ci`],
//! [`repeat_string`]) are the only exceptions.
//!
//! Most functions that take a parser and produce a transformed parser are
//! also available as methods on the [`Parser`](crate::Parser) trait.
//!
//! # Consumption and alternation
//!
//! Every combinator honors one contract: a failing parser has either
//! consumed nothing, in which case an enclosing [`either`] tries its next
//! alternative, or it has consumed input, in which case the choice point is
//! committed and the failure propagates. Backtracking is opt-in through
//! [`attempt`]. See the crate-level documentation for the full contract.

use crate::{
    BoxParser, Expected, ExpectedSet, ParseError, Parser, ParseState, PosDelta, Position,
};
use core::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Creates a parser that matches exactly one of its arguments.
///
/// `alt!` accepts any number of parsers of possibly different types but
/// equal output types, and folds them into nested [`either`] calls:
/// alternatives are tried in order, with the usual rule that an
/// alternative which fails after consuming input commits the whole
/// alternation to failure.
///
/// # Example
///
/// ```
/// use descent::{combinator::{alt, string}, Parser};
///
/// let day = alt!(string("mon"), string("tue"), string("wed"));
/// assert_eq!(day.parse("tue").unwrap(), "tue");
/// ```
pub use descent_macros::alt;

/// Creates a parser that runs a sequence of parsers and produces a tuple.
///
/// `seq!` accepts any number of parsers and folds them into nested
/// [`pair`] calls, flattening the result into a single tuple in argument
/// order. If any element fails, the sequence fails with that element's
/// consumption.
///
/// # Example
///
/// ```
/// use descent::{combinator::{seq, token}, Parser};
///
/// let triple = seq!(token('a'), token('b'), token('c'));
/// assert_eq!(triple.parse("abc").unwrap(), ('a', 'b', 'c'));
/// ```
pub use descent_macros::seq;

#[derive(Debug, Clone)]
struct ConstantParser<F, R>(F, PhantomData<fn() -> R>);

impl<T, F, R> Parser<T> for ConstantParser<F, R>
where
    T: Clone,
    F: Fn() -> R,
{
    type Output = R;

    fn try_parse(
        &self,
        _state: &mut ParseState<'_, T>,
        _expecteds: &mut ExpectedSet<T>,
    ) -> Option<R> {
        Some((self.0)())
    }
}

/// Creates a parser that unconditionally produces a value.
///
/// The provided function is called to construct the value each time the
/// parser runs. No input is consumed and no expectations are reported.
///
/// # Example
///
/// ```
/// use descent::{combinator::constant, Parser};
///
/// let parsed: i32 = constant(|| 42).parse("anything").unwrap();
/// assert_eq!(parsed, 42);
/// ```
#[inline]
pub const fn constant<T, F, R>(const_fn: F) -> impl Parser<T, Output = R>
where
    T: Clone,
    F: Fn() -> R,
{
    ConstantParser(const_fn, PhantomData)
}

#[derive(Debug, Clone)]
struct FailParser<R>(Arc<str>, PhantomData<fn() -> R>);

impl<T, R> Parser<T> for FailParser<R>
where
    T: Clone,
{
    type Output = R;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<R> {
        expecteds.push(Expected::tokens(Vec::new()));
        state.set_error(None, false, state.location(), Some(Arc::clone(&self.0)));
        None
    }
}

/// Creates a parser that unconditionally fails with a message.
///
/// No input is consumed, so an enclosing [`either`] moves on to its next
/// alternative.
#[inline]
pub fn fail<T, R, M>(message: M) -> impl Parser<T, Output = R>
where
    T: Clone,
    M: Into<Arc<str>>,
{
    FailParser(message.into(), PhantomData)
}

#[derive(Debug, Clone)]
struct AnyParser;

impl<T: Clone> Parser<T> for AnyParser {
    type Output = T;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<T> {
        match state.current() {
            Some(token) => {
                let token = token.clone();
                state.advance(1);
                Some(token)
            }
            None => {
                expecteds.push(Expected::label("any token"));
                state.set_error(None, true, state.location(), None);
                None
            }
        }
    }
}

/// Creates a parser that consumes and produces the next token, whatever it
/// is. Fails only at the end of the input.
///
/// # Example
///
/// ```
/// use descent::{combinator::any, Parser};
///
/// assert_eq!(any().parse("x").unwrap(), 'x');
/// assert!(any::<char>().parse("").is_err());
/// ```
#[inline]
pub const fn any<T: Clone>() -> impl Parser<T, Output = T> {
    AnyParser
}

#[derive(Debug, Clone)]
struct TokenParser<T>(T, Arc<[T]>);

impl<T: Clone + PartialEq> Parser<T> for TokenParser<T> {
    type Output = T;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<T> {
        match state.current() {
            Some(token) if *token == self.0 => {
                let token = token.clone();
                state.advance(1);
                Some(token)
            }
            found => {
                let unexpected = found.cloned();
                let at_eof = unexpected.is_none();
                expecteds.push(Expected::Tokens(Arc::clone(&self.1)));
                state.set_error(unexpected, at_eof, state.location(), None);
                None
            }
        }
    }
}

/// Creates a parser that matches one specific token.
///
/// On a mismatch nothing is consumed and the offending token (or the end
/// of input) is reported as unexpected.
///
/// # Example
///
/// ```
/// use descent::{combinator::token, Parser};
///
/// assert_eq!(token('a').parse("ab").unwrap(), 'a');
/// let err = token('a').parse("ba").unwrap_err();
/// assert_eq!(err.unexpected(), Some(&'b'));
/// ```
#[inline]
pub fn token<T: Clone + PartialEq>(expected: T) -> impl Parser<T, Output = T> {
    let tokens: Arc<[T]> = Arc::from(vec![expected.clone()]);
    TokenParser(expected, tokens)
}

#[derive(Debug, Clone)]
struct SatisfyParser<F>(F);

impl<T, F> Parser<T> for SatisfyParser<F>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    type Output = T;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        _expecteds: &mut ExpectedSet<T>,
    ) -> Option<T> {
        match state.current() {
            Some(token) if (self.0)(token) => {
                let token = token.clone();
                state.advance(1);
                Some(token)
            }
            found => {
                let unexpected = found.cloned();
                let at_eof = unexpected.is_none();
                state.set_error(unexpected, at_eof, state.location(), None);
                None
            }
        }
    }
}

/// Creates a parser that matches a token satisfying a predicate.
///
/// `satisfy` reports no expectation of its own; pair it with
/// [`labelled`](crate::Parser::labelled) to give failures a name:
///
/// ```
/// use descent::{combinator::satisfy, Parser};
///
/// let digit = satisfy(|c: &char| c.is_ascii_digit()).labelled("digit");
/// assert_eq!(digit.parse("7").unwrap(), '7');
/// let err = digit.parse("x").unwrap_err();
/// assert_eq!(format!("{err}"), "Parse error.\n    unexpected \"x\"\n    expected digit\n    at line 1, col 1");
/// ```
#[inline]
pub const fn satisfy<T, F>(predicate: F) -> impl Parser<T, Output = T>
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    SatisfyParser(predicate)
}

#[derive(Debug, Clone)]
struct VerbatimParser<T>(Arc<[T]>);

impl<T: Clone + PartialEq> Parser<T> for VerbatimParser<T> {
    type Output = Arc<[T]>;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Arc<[T]>> {
        match match_prefix(state, &self.0, |a, b| a == b) {
            Ok(()) => Some(Arc::clone(&self.0)),
            Err(()) => {
                expecteds.push(Expected::Tokens(Arc::clone(&self.0)));
                None
            }
        }
    }
}

// Matches `pattern` at the cursor. On success the whole pattern is
// consumed. On a mismatch at index i the matched prefix of length i stays
// consumed and the error slot records the offending token, which is the
// commitment an enclosing `either` observes.
fn match_prefix<T: Clone, U>(
    state: &mut ParseState<'_, T>,
    pattern: &[U],
    matches: impl Fn(&T, &U) -> bool,
) -> Result<(), ()> {
    let got = state.look_ahead(pattern.len());
    let mut mismatch = got.len();
    for (idx, (have, want)) in got.iter().zip(pattern.iter()).enumerate() {
        if !matches(have, want) {
            mismatch = idx;
            break;
        }
    }
    if mismatch == pattern.len() {
        state.advance(pattern.len());
        Ok(())
    } else {
        state.advance(mismatch);
        let unexpected = state.current().cloned();
        let at_eof = unexpected.is_none();
        state.set_error(unexpected, at_eof, state.location(), None);
        Err(())
    }
}

/// Creates a parser that matches a literal token sequence.
///
/// On the first mismatch the matched prefix stays consumed, so an
/// enclosing [`either`] treats the failure as committed. Wrap in
/// [`attempt`] when alternatives share a prefix.
///
/// # Example
///
/// ```
/// use descent::{combinator::verbatim, Parser};
///
/// let magic = verbatim(vec![0xCAu8, 0xFE]);
/// assert!(magic.parse(&[0xCA, 0xFE, 0x00][..]).is_ok());
/// assert!(magic.parse(&[0xCA, 0x00][..]).is_err());
/// ```
#[inline]
pub fn verbatim<T: Clone + PartialEq>(
    pattern: impl Into<Arc<[T]>>,
) -> impl Parser<T, Output = Arc<[T]>> {
    VerbatimParser(pattern.into())
}

#[derive(Debug, Clone)]
struct StringParser {
    pattern: Arc<[char]>,
    text: Arc<str>,
    case_insensitive: bool,
}

impl Parser<char> for StringParser {
    type Output = String;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, char>,
        expecteds: &mut ExpectedSet<char>,
    ) -> Option<String> {
        let res = if self.case_insensitive {
            match_prefix(state, &self.pattern, |a, b| {
                a == b || a.to_lowercase().eq(b.to_lowercase())
            })
        } else {
            match_prefix(state, &self.pattern, |a, b| a == b)
        };
        match res {
            Ok(()) => Some(self.text.as_ref().to_owned()),
            Err(()) => {
                expecteds.push(Expected::Tokens(Arc::clone(&self.pattern)));
                None
            }
        }
    }
}

/// Creates a parser that matches a literal string, character by character.
///
/// Like [`verbatim`], a mismatch leaves the matched prefix consumed:
///
/// ```
/// use descent::{combinator::string, Parser};
///
/// let p = string("food").or(string("foul"));
/// // "foul" shares the prefix "fo" with "food", which commits the first
/// // alternative; wrap it in `attempt` to allow the second one to run.
/// let err = p.parse("foul").unwrap_err();
/// assert_eq!(err.unexpected(), Some(&'u'));
/// assert_eq!(err.position().col, 3);
/// ```
#[inline]
pub fn string(text: impl Into<Arc<str>>) -> impl Parser<char, Output = String> {
    let text = text.into();
    StringParser {
        pattern: text.chars().collect::<Vec<_>>().into(),
        text,
        case_insensitive: false,
    }
}

/// Creates a parser that matches a literal string, ignoring character
/// case. Produces the pattern text in its original casing.
///
/// # Example
///
/// ```
/// use descent::{combinator::string_ci, Parser};
///
/// assert_eq!(string_ci("select").parse("SeLeCt").unwrap(), "select");
/// ```
#[inline]
pub fn string_ci(text: impl Into<Arc<str>>) -> impl Parser<char, Output = String> {
    let text = text.into();
    StringParser {
        pattern: text.chars().collect::<Vec<_>>().into(),
        text,
        case_insensitive: true,
    }
}

#[derive(Debug, Clone)]
struct EndParser;

impl<T: Clone> Parser<T> for EndParser {
    type Output = ();

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<()> {
        match state.current() {
            None => Some(()),
            Some(token) => {
                let unexpected = Some(token.clone());
                expecteds.push(Expected::Eof);
                state.set_error(unexpected, false, state.location(), None);
                None
            }
        }
    }
}

/// Creates a parser that succeeds only at the end of the input.
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, end, pair}, Parser};
///
/// let whole = pair(any(), end());
/// assert!(whole.parse("x").is_ok());
/// assert!(whole.parse("xy").is_err());
/// ```
#[inline]
pub const fn end<T: Clone>() -> impl Parser<T, Output = ()> {
    EndParser
}

#[derive(Debug, Clone)]
struct CurrentOffsetParser;

impl<T: Clone> Parser<T> for CurrentOffsetParser {
    type Output = usize;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        _expecteds: &mut ExpectedSet<T>,
    ) -> Option<usize> {
        Some(state.location())
    }
}

/// Creates a parser producing the cursor's token offset without touching
/// the input.
#[inline]
pub const fn current_offset<T: Clone>() -> impl Parser<T, Output = usize> {
    CurrentOffsetParser
}

#[derive(Debug, Clone)]
struct CurrentPosDeltaParser;

impl<T: Clone> Parser<T> for CurrentPosDeltaParser {
    type Output = PosDelta;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        _expecteds: &mut ExpectedSet<T>,
    ) -> Option<PosDelta> {
        Some(state.source_pos_delta())
    }
}

/// Creates a parser producing the movement from the start of the input to
/// the cursor, without touching the input.
#[inline]
pub const fn current_pos_delta<T: Clone>() -> impl Parser<T, Output = PosDelta> {
    CurrentPosDeltaParser
}

#[derive(Debug, Clone)]
struct CurrentPosParser;

impl<T: Clone> Parser<T> for CurrentPosParser {
    type Output = Position;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        _expecteds: &mut ExpectedSet<T>,
    ) -> Option<Position> {
        Some(Position::START + state.source_pos_delta())
    }
}

/// Creates a parser producing the cursor's 1-based line/column position,
/// without touching the input.
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, current_pos, prefix}, Config, Parser, Position};
///
/// let after_one = prefix(any(), current_pos());
/// let pos = after_one.parse_with("a\nb", &Config::for_chars()).unwrap();
/// assert_eq!(pos, Position::new(1, 2));
/// ```
#[inline]
pub const fn current_pos<T: Clone>() -> impl Parser<T, Output = Position> {
    CurrentPosParser
}

#[derive(Debug, Clone)]
struct MapParser<P, F>(P, F);

impl<T, P, F, R> Parser<T> for MapParser<P, F>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(P::Output) -> R,
{
    type Output = R;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<R> {
        self.0.try_parse(state, expecteds).map(&self.1)
    }
}

/// Creates a parser whose output is transformed by a function.
///
/// See also [`Parser::map`].
#[inline]
pub const fn map<T, P, F, R>(parser: P, map_fn: F) -> impl Parser<T, Output = R>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(P::Output) -> R,
{
    MapParser(parser, map_fn)
}

macro_rules! define_map_arity {
    ($(#[$doc:meta])* $name:ident, $strukt:ident, $($p:ident: $ty:ident),+) => {
        #[derive(Debug, Clone)]
        struct $strukt<F, $($ty),+>(F, $($ty),+);

        impl<T, F, R, $($ty),+> Parser<T> for $strukt<F, $($ty),+>
        where
            T: Clone,
            F: Fn($($ty::Output),+) -> R,
            $($ty: Parser<T>,)+
        {
            type Output = R;

            fn try_parse(
                &self,
                state: &mut ParseState<'_, T>,
                expecteds: &mut ExpectedSet<T>,
            ) -> Option<R> {
                let $strukt(f, $($p),+) = self;
                $(let $p = $p.try_parse(state, expecteds)?;)+
                Some(f($($p),+))
            }
        }

        $(#[$doc])*
        #[inline]
        pub const fn $name<T, F, R, $($ty),+>(f: F, $($p: $ty),+) -> impl Parser<T, Output = R>
        where
            T: Clone,
            F: Fn($($ty::Output),+) -> R,
            $($ty: Parser<T>,)+
        {
            $strukt(f, $($p),+)
        }
    };
}

define_map_arity!(
    /// Runs two parsers in sequence and combines their outputs with `f`.
    /// If either fails, the sequence fails with that parser's consumption.
    map2, Map2Parser, p1: P1, p2: P2
);
define_map_arity!(
    /// Runs three parsers in sequence and combines their outputs with `f`.
    map3, Map3Parser, p1: P1, p2: P2, p3: P3
);
define_map_arity!(
    /// Runs four parsers in sequence and combines their outputs with `f`.
    map4, Map4Parser, p1: P1, p2: P2, p3: P3, p4: P4
);
define_map_arity!(
    /// Runs five parsers in sequence and combines their outputs with `f`.
    map5, Map5Parser, p1: P1, p2: P2, p3: P3, p4: P4, p5: P5
);
define_map_arity!(
    /// Runs six parsers in sequence and combines their outputs with `f`.
    map6, Map6Parser, p1: P1, p2: P2, p3: P3, p4: P4, p5: P5, p6: P6
);
define_map_arity!(
    /// Runs seven parsers in sequence and combines their outputs with `f`.
    map7, Map7Parser, p1: P1, p2: P2, p3: P3, p4: P4, p5: P5, p6: P6, p7: P7
);
define_map_arity!(
    /// Runs eight parsers in sequence and combines their outputs with `f`.
    /// Higher arities are expressed by composing [`seq!`] or nested pairs.
    map8, Map8Parser, p1: P1, p2: P2, p3: P3, p4: P4, p5: P5, p6: P6, p7: P7, p8: P8
);

/// Runs two parsers in sequence and produces both outputs as a tuple.
///
/// See also [`Parser::then`] and the variadic [`seq!`].
#[inline]
pub const fn pair<T, P, Q>(first: P, second: Q) -> impl Parser<T, Output = (P::Output, Q::Output)>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    map2(|a, b| (a, b), first, second)
}

/// Runs two parsers in sequence, keeping only the second output.
///
/// # Example
///
/// ```
/// use descent::{combinator::{prefix, string, token}, Parser};
///
/// let value = prefix(token('#'), string("tag"));
/// assert_eq!(value.parse("#tag").unwrap(), "tag");
/// ```
#[inline]
pub const fn prefix<T, P, Q>(first: P, second: Q) -> impl Parser<T, Output = Q::Output>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    map2(|_, b| b, first, second)
}

/// Runs two parsers in sequence, keeping only the first output.
#[inline]
pub const fn suffix<T, P, Q>(first: P, second: Q) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    map2(|a, _| a, first, second)
}

/// Runs three parsers in sequence, keeping only the middle output.
///
/// # Example
///
/// ```
/// use descent::{combinator::{delimited, string, token}, Parser};
///
/// let parenthesized = delimited(token('('), string("x"), token(')'));
/// assert_eq!(parenthesized.parse("(x)").unwrap(), "x");
/// ```
#[inline]
pub const fn delimited<T, P, Q, R>(open: P, inner: Q, close: R) -> impl Parser<T, Output = Q::Output>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
    R: Parser<T>,
{
    map3(|_, x, _| x, open, inner, close)
}

#[derive(Debug, Clone)]
struct BindParser<P, F>(P, F);

impl<T, P, F, Q> Parser<T> for BindParser<P, F>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(P::Output) -> Q,
    Q: Parser<T>,
{
    type Output = Q::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Q::Output> {
        let value = self.0.try_parse(state, expecteds)?;
        (self.1)(value).try_parse(state, expecteds)
    }
}

/// Creates a parser that feeds one parser's output into a function
/// producing the next parser to run.
///
/// This is the escape hatch to context-sensitive grammars; everything else
/// in this module builds its structure up front.
///
/// See also [`Parser::bind`].
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, bind, token}, Parser};
///
/// // Matches any character followed by the same character again.
/// let doubled = bind(any(), |c| token(c));
/// assert_eq!(doubled.parse("aa").unwrap(), 'a');
/// assert!(doubled.parse("ab").is_err());
/// ```
#[inline]
pub const fn bind<T, P, F, Q>(parser: P, next: F) -> impl Parser<T, Output = Q::Output>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(P::Output) -> Q,
    Q: Parser<T>,
{
    BindParser(parser, next)
}

#[derive(Debug, Clone)]
struct EitherParser<P, Q>(P, Q);

impl<T, P, Q> Parser<T> for EitherParser<P, Q>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T, Output = P::Output>,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        let start = state.location();
        let mut first = state.rent_expecteds();
        if let Some(value) = self.0.try_parse(state, &mut first) {
            expecteds.append(&mut first);
            return Some(value);
        }
        if state.location() != start {
            // The first alternative consumed input before failing, which
            // commits the whole choice to it.
            expecteds.append(&mut first);
            return None;
        }
        let mut second = state.rent_expecteds();
        let result = self.1.try_parse(state, &mut second);
        if result.is_some() || state.location() == start {
            expecteds.append(&mut first);
        }
        expecteds.append(&mut second);
        result
    }
}

/// Creates a parser that tries two alternatives in order.
///
/// The second alternative runs only if the first fails without consuming
/// any input. A failure after consumption commits: the alternation fails
/// without trying further alternatives, which keeps parsing linear-time
/// and error positions precise. Use [`attempt`] to opt into backtracking.
///
/// On failure at the choice point, the expectations of both alternatives
/// are merged into the reported error.
///
/// See also [`Parser::or`], the variadic [`alt!`], and [`one_of`].
///
/// # Example
///
/// ```
/// use descent::{combinator::{attempt, either, string}, Parser};
///
/// let p = either(attempt(string("food")), string("foul"));
/// assert_eq!(p.parse("foul").unwrap(), "foul");
/// ```
#[inline]
pub const fn either<T, P, Q>(first: P, second: Q) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T, Output = P::Output>,
{
    EitherParser(first, second)
}

// The alternation loop shared by `one_of`, the expression builder, and the
// permutation builder. Alternatives are tried in order; the expectations
// of branches that failed at the entry location accumulate and are handed
// to the caller's buffer once the outcome is known.
pub(crate) fn run_alternatives<T, P>(
    alternatives: &[P],
    state: &mut ParseState<'_, T>,
    expecteds: &mut ExpectedSet<T>,
) -> Option<P::Output>
where
    T: Clone,
    P: Parser<T>,
{
    let start = state.location();
    let mut grouped = state.rent_expecteds();
    for parser in alternatives {
        let mut branch = state.rent_expecteds();
        match parser.try_parse(state, &mut branch) {
            Some(value) => {
                grouped.append(&mut branch);
                expecteds.append(&mut grouped);
                return Some(value);
            }
            None if state.location() == start => {
                grouped.append(&mut branch);
            }
            None => {
                expecteds.append(&mut branch);
                return None;
            }
        }
    }
    expecteds.append(&mut grouped);
    if alternatives.is_empty() {
        state.set_error(None, false, start, None);
    }
    None
}

#[derive(Debug, Clone)]
struct OneOfParser<P>(Vec<P>);

impl<T, P> Parser<T> for OneOfParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        run_alternatives(&self.0, state, expecteds)
    }
}

/// Creates a parser that tries each of a collection of alternatives in
/// order, with the same commitment rule as [`either`].
///
/// All alternatives must be of one type; use [`alt!`] for alternatives of
/// different types.
///
/// # Example
///
/// ```
/// use descent::{combinator::{one_of, token}, Parser};
///
/// let sign = one_of([token('+'), token('-')]);
/// assert_eq!(sign.parse("-3").unwrap(), '-');
/// ```
#[inline]
pub fn one_of<T, P>(alternatives: impl IntoIterator<Item = P>) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
{
    OneOfParser(alternatives.into_iter().collect())
}

#[derive(Debug, Clone)]
struct AttemptParser<P>(P);

impl<T, P> Parser<T> for AttemptParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        state.push_bookmark();
        match self.0.try_parse(state, expecteds) {
            Some(value) => {
                state.pop_bookmark();
                Some(value)
            }
            None => {
                state.rewind();
                None
            }
        }
    }
}

/// Creates a parser that backtracks on failure.
///
/// If the inner parser fails after consuming input, the cursor is restored
/// to where it was on entry, so an enclosing [`either`] treats the failure
/// as uncommitted and tries its next alternative. On success `attempt` is
/// invisible.
///
/// # Example
///
/// ```
/// use descent::{combinator::{attempt, string}, Parser};
///
/// // Without `attempt` the shared prefix "fo" would commit the first
/// // alternative and the parse of "foul" would fail at the 'u'.
/// let p = attempt(string("food")).or(string("foul"));
/// assert_eq!(p.parse("foul").unwrap(), "foul");
/// ```
#[inline]
pub const fn attempt<T, P>(parser: P) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
{
    AttemptParser(parser)
}

#[derive(Debug, Clone)]
struct LookAheadParser<P>(P);

impl<T, P> Parser<T> for LookAheadParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        state.push_bookmark();
        match self.0.try_parse(state, expecteds) {
            Some(value) => {
                state.rewind();
                Some(value)
            }
            None => {
                state.pop_bookmark();
                None
            }
        }
    }
}

/// Creates a parser that matches the inner parser without consuming input.
///
/// On success the cursor is restored to the entry position; on failure the
/// inner parser's consumption stands. The mirror image of [`attempt`].
#[inline]
pub const fn look_ahead<T, P>(parser: P) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
{
    LookAheadParser(parser)
}

#[derive(Debug, Clone)]
struct NotParser<P>(P);

impl<T, P> Parser<T> for NotParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = ();

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        _expecteds: &mut ExpectedSet<T>,
    ) -> Option<()> {
        let unexpected = state.current().cloned();
        let start = state.location();
        state.push_bookmark();
        let mut discarded = state.rent_expecteds();
        let result = self.0.try_parse(state, &mut discarded);
        drop(discarded);
        match result {
            Some(_) => {
                state.rewind();
                let at_eof = unexpected.is_none();
                state.set_error(unexpected, at_eof, start, None);
                None
            }
            None => {
                state.pop_bookmark();
                Some(())
            }
        }
    }
}

/// Creates a parser that succeeds exactly when the inner parser fails.
///
/// The inner parser's expectations are discarded. If the inner parser
/// failed after consuming input, that consumption stands; combine with
/// [`attempt`] for a fully non-consuming negative lookahead. When the
/// inner parser succeeds, `not` fails, reporting the token at the entry
/// position as unexpected.
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, not, prefix, token}, Parser};
///
/// // Any character except a quote.
/// let unquoted = prefix(not(token('"')), any());
/// assert_eq!(unquoted.parse("x").unwrap(), 'x');
/// assert!(unquoted.parse("\"").is_err());
/// ```
#[inline]
pub const fn not<T, P>(parser: P) -> impl Parser<T, Output = ()>
where
    T: Clone,
    P: Parser<T>,
{
    NotParser(parser)
}

#[derive(Debug, Clone)]
struct OptParser<P>(P);

impl<T, P> Parser<T> for OptParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = Option<P::Output>;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Option<P::Output>> {
        let start = state.location();
        let mut branch = state.rent_expecteds();
        let result = self.0.try_parse(state, &mut branch);
        expecteds.append(&mut branch);
        match result {
            Some(value) => Some(Some(value)),
            None if state.location() == start => Some(None),
            None => None,
        }
    }
}

/// Creates a parser that turns a non-consuming failure into `None`.
///
/// A failure that consumed input still propagates, like the committed case
/// of [`either`].
#[inline]
pub const fn opt<T, P>(parser: P) -> impl Parser<T, Output = Option<P::Output>>
where
    T: Clone,
    P: Parser<T>,
{
    OptParser(parser)
}

// Shared loop behind many/skip_many and their at-least-once variants.
// `sink` receives each parsed value; on clean exit the final iteration's
// expectations describe what another repetition would have accepted.
fn run_many<T, P>(
    parser: &P,
    state: &mut ParseState<'_, T>,
    expecteds: &mut ExpectedSet<T>,
    mut sink: impl FnMut(P::Output),
) -> Option<()>
where
    T: Clone,
    P: Parser<T>,
{
    loop {
        let start = state.location();
        let mut branch = state.rent_expecteds();
        match parser.try_parse(state, &mut branch) {
            Some(value) => {
                if state.location() == start {
                    panic!(
                        "repetition applied to a parser that succeeded without consuming input; \
                         this would loop forever"
                    );
                }
                sink(value);
            }
            None if state.location() == start => {
                expecteds.append(&mut branch);
                return Some(());
            }
            None => {
                expecteds.append(&mut branch);
                return None;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ManyParser<P>(P);

impl<T, P> Parser<T> for ManyParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = Vec<P::Output>;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Vec<P::Output>> {
        let mut values = Vec::new();
        run_many(&self.0, state, expecteds, |v| values.push(v))?;
        Some(values)
    }
}

/// Creates a parser that applies the inner parser zero or more times,
/// collecting the outputs in input order.
///
/// Repetition stops at the first failure that consumed no input. A
/// failure that consumed input fails the whole repetition.
///
/// # Panics
///
/// Panics if the inner parser succeeds without consuming input, since the
/// repetition could never terminate. This is a bug in the grammar, not a
/// parse failure.
///
/// # Example
///
/// ```
/// use descent::{combinator::{many, satisfy}, Parser};
///
/// let digits = many(satisfy(|c: &char| c.is_ascii_digit()));
/// assert_eq!(digits.parse("123x").unwrap(), vec!['1', '2', '3']);
/// assert_eq!(digits.parse("x").unwrap(), vec![]);
/// ```
#[inline]
pub const fn many<T, P>(parser: P) -> impl Parser<T, Output = Vec<P::Output>>
where
    T: Clone,
    P: Parser<T>,
{
    ManyParser(parser)
}

#[derive(Debug, Clone)]
struct Many1Parser<P>(P);

impl<T, P> Parser<T> for Many1Parser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = Vec<P::Output>;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Vec<P::Output>> {
        let start = state.location();
        let first = self.0.try_parse(state, expecteds)?;
        if state.location() == start {
            panic!(
                "repetition applied to a parser that succeeded without consuming input; \
                 this would loop forever"
            );
        }
        let mut values = vec![first];
        run_many(&self.0, state, expecteds, |v| values.push(v))?;
        Some(values)
    }
}

/// Creates a parser that applies the inner parser one or more times.
///
/// Like [`many`], but the first application must succeed; its failure
/// propagates as the repetition's failure.
///
/// # Panics
///
/// Panics if the inner parser succeeds without consuming input.
#[inline]
pub const fn many1<T, P>(parser: P) -> impl Parser<T, Output = Vec<P::Output>>
where
    T: Clone,
    P: Parser<T>,
{
    Many1Parser(parser)
}

#[derive(Debug, Clone)]
struct SkipManyParser<P>(P);

impl<T, P> Parser<T> for SkipManyParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = ();

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<()> {
        run_many(&self.0, state, expecteds, |_| {})
    }
}

/// Like [`many`], but discards the outputs. Useful for skipping
/// whitespace and other separators without allocating.
#[inline]
pub const fn skip_many<T, P>(parser: P) -> impl Parser<T, Output = ()>
where
    T: Clone,
    P: Parser<T>,
{
    SkipManyParser(parser)
}

#[derive(Debug, Clone)]
struct SkipMany1Parser<P>(P);

impl<T, P> Parser<T> for SkipMany1Parser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = ();

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<()> {
        let start = state.location();
        self.0.try_parse(state, expecteds)?;
        if state.location() == start {
            panic!(
                "repetition applied to a parser that succeeded without consuming input; \
                 this would loop forever"
            );
        }
        run_many(&self.0, state, expecteds, |_| {})
    }
}

/// Like [`many1`], but discards the outputs.
#[inline]
pub const fn skip_many1<T, P>(parser: P) -> impl Parser<T, Output = ()>
where
    T: Clone,
    P: Parser<T>,
{
    SkipMany1Parser(parser)
}

#[derive(Debug, Clone)]
struct RepeatedParser<P>(P, usize);

impl<T, P> Parser<T> for RepeatedParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = Vec<P::Output>;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Vec<P::Output>> {
        let mut values = Vec::with_capacity(self.1);
        for _ in 0..self.1 {
            values.push(self.0.try_parse(state, expecteds)?);
        }
        Some(values)
    }
}

/// Creates a parser that applies the inner parser exactly `count` times.
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, repeated}, Parser};
///
/// let three = repeated(any(), 3);
/// assert_eq!(three.parse("abcd").unwrap(), vec!['a', 'b', 'c']);
/// assert!(three.parse("ab").is_err());
/// ```
#[inline]
pub const fn repeated<T, P>(parser: P, count: usize) -> impl Parser<T, Output = Vec<P::Output>>
where
    T: Clone,
    P: Parser<T>,
{
    RepeatedParser(parser, count)
}

#[derive(Debug, Clone)]
struct RepeatStringParser<P>(P, usize);

impl<P> Parser<char> for RepeatStringParser<P>
where
    P: Parser<char, Output = char>,
{
    type Output = String;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, char>,
        expecteds: &mut ExpectedSet<char>,
    ) -> Option<String> {
        let mut out = String::with_capacity(self.1);
        for _ in 0..self.1 {
            out.push(self.0.try_parse(state, expecteds)?);
        }
        Some(out)
    }
}

/// Creates a parser that applies a character parser exactly `count` times
/// and packs the results into a `String`.
#[inline]
pub const fn repeat_string<P>(parser: P, count: usize) -> impl Parser<char, Output = String>
where
    P: Parser<char, Output = char>,
{
    RepeatStringParser(parser, count)
}

// Shared loop behind many_until/many1_until.
fn run_until<T, P, Q>(
    item: &P,
    terminator: &Q,
    state: &mut ParseState<'_, T>,
    expecteds: &mut ExpectedSet<T>,
    mut sink: impl FnMut(P::Output),
) -> Option<Q::Output>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    loop {
        let start = state.location();
        let mut stop = state.rent_expecteds();
        match terminator.try_parse(state, &mut stop) {
            Some(end) => {
                expecteds.append(&mut stop);
                return Some(end);
            }
            None if state.location() != start => {
                expecteds.append(&mut stop);
                return None;
            }
            None => {}
        }
        let mut branch = state.rent_expecteds();
        match item.try_parse(state, &mut branch) {
            Some(value) => {
                if state.location() == start {
                    panic!(
                        "repetition applied to a parser that succeeded without consuming input; \
                         this would loop forever"
                    );
                }
                sink(value);
            }
            None if state.location() == start => {
                expecteds.append(&mut stop);
                expecteds.append(&mut branch);
                return None;
            }
            None => {
                expecteds.append(&mut branch);
                return None;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ManyUntilParser<P, Q>(P, Q);

impl<T, P, Q> Parser<T> for ManyUntilParser<P, Q>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    type Output = (Vec<P::Output>, Q::Output);

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<(Vec<P::Output>, Q::Output)> {
        let mut values = Vec::new();
        let end = run_until(&self.0, &self.1, state, expecteds, |v| values.push(v))?;
        Some((values, end))
    }
}

/// Creates a parser that applies `item` until `terminator` matches.
///
/// At each step the terminator is tried first; its success stops the
/// repetition and its output is returned alongside the collected items. A
/// terminator failure that consumed input fails the repetition, as does
/// any item failure.
///
/// # Panics
///
/// Panics if `item` succeeds without consuming input.
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, many_until, string}, Parser};
///
/// let comment = many_until(any(), string("*/"));
/// let (body, _) = comment.parse("abc*/").unwrap();
/// assert_eq!(body, vec!['a', 'b', 'c']);
/// ```
#[inline]
pub const fn many_until<T, P, Q>(
    item: P,
    terminator: Q,
) -> impl Parser<T, Output = (Vec<P::Output>, Q::Output)>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    ManyUntilParser(item, terminator)
}

#[derive(Debug, Clone)]
struct Many1UntilParser<P, Q>(P, Q);

impl<T, P, Q> Parser<T> for Many1UntilParser<P, Q>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    type Output = (Vec<P::Output>, Q::Output);

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<(Vec<P::Output>, Q::Output)> {
        let start = state.location();
        let first = self.0.try_parse(state, expecteds)?;
        if state.location() == start {
            panic!(
                "repetition applied to a parser that succeeded without consuming input; \
                 this would loop forever"
            );
        }
        let mut values = vec![first];
        let end = run_until(&self.0, &self.1, state, expecteds, |v| values.push(v))?;
        Some((values, end))
    }
}

/// Like [`many_until`], but `item` must match at least once before the
/// terminator is considered.
#[inline]
pub const fn many1_until<T, P, Q>(
    item: P,
    terminator: Q,
) -> impl Parser<T, Output = (Vec<P::Output>, Q::Output)>
where
    T: Clone,
    P: Parser<T>,
    Q: Parser<T>,
{
    Many1UntilParser(item, terminator)
}

// The `separator item` tail loop shared by the sep_by family. Each
// iteration is one repetition step: a step that fails without consuming
// ends the run cleanly, a step that fails after consuming fails the whole
// parser. With `backtrack_steps` each step runs under a bookmark, which
// leaves a trailing separator unconsumed for the caller.
fn run_sep_tail<T, P, S>(
    item: &P,
    separator: &S,
    backtrack_steps: bool,
    state: &mut ParseState<'_, T>,
    expecteds: &mut ExpectedSet<T>,
    values: &mut Vec<P::Output>,
) -> Option<()>
where
    T: Clone,
    P: Parser<T>,
    S: Parser<T>,
{
    loop {
        let start = state.location();
        if backtrack_steps {
            state.push_bookmark();
        }
        let mut branch = state.rent_expecteds();
        let step = match separator.try_parse(state, &mut branch) {
            Some(_) => item.try_parse(state, &mut branch),
            None => None,
        };
        match step {
            Some(value) => {
                if backtrack_steps {
                    state.pop_bookmark();
                }
                if state.location() == start {
                    panic!(
                        "repetition applied to a parser that succeeded without consuming input; \
                         this would loop forever"
                    );
                }
                values.push(value);
            }
            None => {
                if backtrack_steps {
                    state.rewind();
                }
                expecteds.append(&mut branch);
                if state.location() == start {
                    return Some(());
                }
                return None;
            }
        }
    }
}

#[derive(Debug, Clone)]
struct SepByParser<P, S> {
    item: P,
    separator: S,
    min_one: bool,
    trailing: bool,
}

impl<T, P, S> Parser<T> for SepByParser<P, S>
where
    T: Clone,
    P: Parser<T>,
    S: Parser<T>,
{
    type Output = Vec<P::Output>;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Vec<P::Output>> {
        let start = state.location();
        let mut values = Vec::new();
        if self.min_one {
            values.push(self.item.try_parse(state, expecteds)?);
        } else {
            let mut head = state.rent_expecteds();
            let first = self.item.try_parse(state, &mut head);
            expecteds.append(&mut head);
            match first {
                Some(value) => values.push(value),
                None if state.location() == start => return Some(values),
                None => return None,
            }
        }
        run_sep_tail(
            &self.item,
            &self.separator,
            self.trailing,
            state,
            expecteds,
            &mut values,
        )?;
        if self.trailing {
            let stop = state.location();
            let mut tail = state.rent_expecteds();
            let sep = self.separator.try_parse(state, &mut tail);
            expecteds.append(&mut tail);
            if sep.is_none() && state.location() != stop {
                return None;
            }
        }
        Some(values)
    }
}

/// Creates a parser for one or more `item`s separated by `separator`,
/// producing the items.
///
/// # Example
///
/// ```
/// use descent::{combinator::{satisfy, sep_by1, token}, Parser};
///
/// let list = sep_by1(satisfy(|c: &char| c.is_ascii_digit()), token(','));
/// assert_eq!(list.parse("1,2,3").unwrap(), vec!['1', '2', '3']);
/// ```
#[inline]
pub const fn sep_by1<T, P, S>(item: P, separator: S) -> impl Parser<T, Output = Vec<P::Output>>
where
    T: Clone,
    P: Parser<T>,
    S: Parser<T>,
{
    SepByParser {
        item,
        separator,
        min_one: true,
        trailing: false,
    }
}

/// Creates a parser for zero or more `item`s separated by `separator`.
#[inline]
pub const fn sep_by<T, P, S>(item: P, separator: S) -> impl Parser<T, Output = Vec<P::Output>>
where
    T: Clone,
    P: Parser<T>,
    S: Parser<T>,
{
    SepByParser {
        item,
        separator,
        min_one: false,
        trailing: false,
    }
}

/// Creates a parser for one or more `item`s separated by `separator`, with
/// an optional trailing separator.
///
/// # Example
///
/// ```
/// use descent::{combinator::{satisfy, sep_end_by1, token}, Parser};
///
/// let list = sep_end_by1(satisfy(|c: &char| c.is_ascii_digit()), token(','));
/// assert_eq!(list.parse("1,2,").unwrap(), vec!['1', '2']);
/// assert_eq!(list.parse("1,2").unwrap(), vec!['1', '2']);
/// ```
#[inline]
pub const fn sep_end_by1<T, P, S>(item: P, separator: S) -> impl Parser<T, Output = Vec<P::Output>>
where
    T: Clone,
    P: Parser<T>,
    S: Parser<T>,
{
    SepByParser {
        item,
        separator,
        min_one: true,
        trailing: true,
    }
}

/// Creates a parser for zero or more `item`s separated by `separator`,
/// with an optional trailing separator.
#[inline]
pub const fn sep_end_by<T, P, S>(item: P, separator: S) -> impl Parser<T, Output = Vec<P::Output>>
where
    T: Clone,
    P: Parser<T>,
    S: Parser<T>,
{
    SepByParser {
        item,
        separator,
        min_one: false,
        trailing: true,
    }
}

#[derive(Debug, Clone)]
struct RecParser<P, F>(OnceLock<P>, F);

impl<T, P, F> Parser<T> for RecParser<P, F>
where
    T: Clone,
    P: Parser<T>,
    F: Fn() -> P,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        self.0.get_or_init(&self.1).try_parse(state, expecteds)
    }
}

/// Creates a parser that defers construction of its inner parser until
/// first use, enabling recursive grammars.
///
/// The factory runs once, on the first parse, and its result is cached.
/// Nothing is consumed by the deferral itself.
///
/// # Example
///
/// ```
/// use descent::{
///     combinator::{delimited, rec, satisfy, token},
///     BoxParser, Parser,
/// };
///
/// // expr = digit | '(' expr ')'
/// fn expr() -> BoxParser<char, char> {
///     satisfy(|c: &char| c.is_ascii_digit())
///         .or(delimited(token('('), rec(expr), token(')')))
///         .boxed()
/// }
///
/// assert_eq!(expr().parse("(((1)))").unwrap(), '1');
/// ```
#[inline]
pub fn rec<T, P, F>(factory: F) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
    F: Fn() -> P,
{
    RecParser(OnceLock::new(), factory)
}

#[derive(Debug, Clone)]
struct LabelledParser<P>(P, Arc<str>);

impl<T, P> Parser<T> for LabelledParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        let start = state.location();
        let mut inner = state.rent_expecteds();
        let result = self.0.try_parse(state, &mut inner);
        if state.location() == start {
            expecteds.push(Expected::Label(Arc::clone(&self.1)));
        } else {
            expecteds.append(&mut inner);
        }
        result
    }
}

/// Gives a parser a human-readable name for error reporting.
///
/// While the inner parser has not consumed anything, whatever expectations
/// it would report are replaced by the single label; once it has consumed
/// input its own, more precise expectations win.
///
/// See also [`Parser::labelled`].
#[inline]
pub fn labelled<T, P>(parser: P, name: impl Into<Arc<str>>) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
{
    LabelledParser(parser, name.into())
}

#[derive(Debug, Clone)]
struct VerifyParser<P, F>(P, F);

impl<T, P, F> Parser<T> for VerifyParser<P, F>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(&P::Output) -> bool,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        let value = self.0.try_parse(state, expecteds)?;
        if (self.1)(&value) {
            Some(value)
        } else {
            expecteds.push(Expected::label("result satisfying assertion"));
            state.set_error(None, false, state.location(), None);
            None
        }
    }
}

/// Creates a parser whose output must satisfy a predicate.
///
/// The check runs after the inner parser succeeds, so a rejected value
/// fails with whatever input the inner parser consumed.
///
/// See also [`Parser::verify`] and [`Parser::verify_with`].
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, verify}, Parser};
///
/// let lower = verify(any(), |c: &char| c.is_lowercase());
/// assert_eq!(lower.parse("a").unwrap(), 'a');
/// assert!(lower.parse("A").is_err());
/// ```
#[inline]
pub const fn verify<T, P, F>(parser: P, predicate: F) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(&P::Output) -> bool,
{
    VerifyParser(parser, predicate)
}

#[derive(Debug, Clone)]
struct VerifyWithParser<P, F, M>(P, F, M);

impl<T, P, F, M> Parser<T> for VerifyWithParser<P, F, M>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(&P::Output) -> bool,
    M: Fn(&P::Output) -> String,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        let value = self.0.try_parse(state, expecteds)?;
        if (self.1)(&value) {
            Some(value)
        } else {
            let message: Arc<str> = Arc::from((self.2)(&value));
            expecteds.push(Expected::label("result satisfying assertion"));
            state.set_error(None, false, state.location(), Some(message));
            None
        }
    }
}

/// Like [`verify`], but a rejected value produces a message built from the
/// value itself.
#[inline]
pub const fn verify_with<T, P, F, M>(
    parser: P,
    predicate: F,
    message: M,
) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
    F: Fn(&P::Output) -> bool,
    M: Fn(&P::Output) -> String,
{
    VerifyWithParser(parser, predicate, message)
}

#[derive(Debug, Clone)]
struct RecoverWithParser<P, H>(P, H);

impl<T, P, H, R> Parser<T> for RecoverWithParser<P, H>
where
    T: Clone + PartialEq,
    P: Parser<T>,
    H: Fn(ParseError<T>) -> R,
    R: Parser<T, Output = P::Output>,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        let mut inner = state.rent_expecteds();
        match self.0.try_parse(state, &mut inner) {
            Some(value) => {
                expecteds.append(&mut inner);
                Some(value)
            }
            None => {
                let error = state.build_error(&inner);
                drop(inner);
                (self.1)(error).try_parse(state, expecteds)
            }
        }
    }
}

/// Creates a parser that hands failures of the inner parser to a handler,
/// which inspects the structured error and chooses a recovery parser.
///
/// The recovery parser runs from wherever the failure left the cursor;
/// nothing is rewound. If the recovery parser itself fails, its failure
/// propagates.
///
/// See also [`Parser::recover_with`].
///
/// # Example
///
/// ```
/// use descent::{combinator::{any, many_until, recover_with, satisfy, token}, Parser};
///
/// // A digit, or on failure: skip to the next ';' and produce '0'.
/// let digit = satisfy(|c: &char| c.is_ascii_digit());
/// let resilient = recover_with(digit, |_err| {
///     many_until(any(), token(';')).map(|_| '0')
/// });
/// assert_eq!(resilient.parse("7").unwrap(), '7');
/// assert_eq!(resilient.parse("oops;").unwrap(), '0');
/// ```
#[inline]
pub const fn recover_with<T, P, H, R>(parser: P, handler: H) -> impl Parser<T, Output = P::Output>
where
    T: Clone + PartialEq,
    P: Parser<T>,
    H: Fn(ParseError<T>) -> R,
    R: Parser<T, Output = P::Output>,
{
    RecoverWithParser(parser, handler)
}

#[derive(Debug, Clone)]
struct TraceParser<P>(P, Arc<str>);

impl<T, P> Parser<T> for TraceParser<P>
where
    T: Clone,
    P: Parser<T>,
{
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        log::trace!(target: "descent", "{}: enter at offset {}", self.1, state.location());
        let result = self.0.try_parse(state, expecteds);
        match &result {
            Some(_) => log::trace!(
                target: "descent",
                "{}: matched through offset {}",
                self.1,
                state.location()
            ),
            None => log::trace!(
                target: "descent",
                "{}: failed at offset {}",
                self.1,
                state.location()
            ),
        }
        result
    }
}

/// Logs entry and outcome of a parser through the [`log`] crate at trace
/// level (target `"descent"`), leaving its behavior unchanged.
///
/// See also [`Parser::trace`].
#[inline]
pub fn trace<T, P>(parser: P, label: impl Into<Arc<str>>) -> impl Parser<T, Output = P::Output>
where
    T: Clone,
    P: Parser<T>,
{
    TraceParser(parser, label.into())
}

#[derive(Debug, Clone)]
struct WithValueParser<P, V>(P, V);

impl<T, P, V> Parser<T> for WithValueParser<P, V>
where
    T: Clone,
    P: Parser<T>,
    V: Clone,
{
    type Output = V;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<V> {
        self.0.try_parse(state, expecteds)?;
        Some(self.1.clone())
    }
}

/// Creates a parser that discards the inner parser's output and produces a
/// clone of `value` instead.
///
/// See also [`Parser::with_value`].
#[inline]
pub const fn with_value<T, P, V>(parser: P, value: V) -> impl Parser<T, Output = V>
where
    T: Clone,
    P: Parser<T>,
    V: Clone,
{
    WithValueParser(parser, value)
}

#[derive(Debug, Clone)]
struct WithDefaultParser<P, V>(P, PhantomData<fn() -> V>);

impl<T, P, V> Parser<T> for WithDefaultParser<P, V>
where
    T: Clone,
    P: Parser<T>,
    V: Default,
{
    type Output = V;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<V> {
        self.0.try_parse(state, expecteds)?;
        Some(V::default())
    }
}

/// Creates a parser that discards the inner parser's output and produces
/// the default value of the target type instead.
///
/// See also [`Parser::with_default`].
///
/// # Example
///
/// ```
/// use descent::{combinator::{string, with_default}, Parser};
///
/// let blank: u32 = with_default(string("null")).parse("null").unwrap();
/// assert_eq!(blank, 0);
/// ```
#[inline]
pub const fn with_default<T, P, V>(parser: P) -> impl Parser<T, Output = V>
where
    T: Clone,
    P: Parser<T>,
    V: Default,
{
    WithDefaultParser(parser, PhantomData)
}

// Boxed trait-object parsers forward to the underlying implementation.
impl<T: Clone, O> Parser<T> for BoxParser<T, O> {
    type Output = O;

    fn try_parse(&self, state: &mut ParseState<'_, T>, expecteds: &mut ExpectedSet<T>) -> Option<O> {
        (**self).try_parse(state, expecteds)
    }
}

impl<'a, T: Clone, P: Parser<T>> Parser<T> for &'a P {
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        (**self).try_parse(state, expecteds)
    }
}

impl<T: Clone, P: Parser<T> + ?Sized> Parser<T> for Arc<P> {
    type Output = P::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        (**self).try_parse(state, expecteds)
    }
}
