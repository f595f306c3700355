//! # Parser combinators over token streams.
//!
//! `descent` is a library for building recursive descent parsers out of
//! small, declarative pieces. A parser is an immutable value that consumes
//! tokens from a [`ParseState`] and either produces a typed value or fails
//! with a structured [`ParseError`]; combinators take parsers and produce
//! new parsers (sequencing, alternation, repetition, lookahead, recursion,
//! operator precedence, permutation).
//!
//! # Contents
//! * [Example](#example)
//! * [Consumption and alternation](#consumption-and-alternation), the one
//!   rule everything else builds on
//! * [Defining a parser](#defining-a-parser)
//! * [Errors](#errors)
//!
//! # Example
//!
//! ```
//! use descent::prelude::*;
//!
//! fn digit() -> impl Parser<char, Output = char> {
//!     satisfy(|c: &char| c.is_ascii_digit()).labelled("digit")
//! }
//!
//! fn number() -> impl Parser<char, Output = u32> {
//!     many1(digit()).map(|ds| ds.into_iter().collect::<String>().parse().unwrap())
//! }
//!
//! // A dotted version triple such as "1.12.3".
//! let version = seq!(
//!     number(),
//!     prefix(token('.'), number()),
//!     prefix(token('.'), number()),
//! );
//!
//! assert_eq!(version.parse("1.12.3").unwrap(), (1, 12, 3));
//!
//! let err = version.parse("1.x").unwrap_err();
//! assert_eq!(err.unexpected(), Some(&'x'));
//! assert_eq!(err.position().col, 3);
//! ```
//!
//! # Consumption and alternation
//!
//! Parsing runs in a single forward pass. When a parser fails, the one
//! fact an enclosing choice inspects is whether the failure *consumed
//! input*:
//!
//! * failed without consuming: [`or`](Parser::or) tries the next
//!   alternative from the same place;
//! * failed after consuming: the choice is committed, and the failure
//!   propagates with a precise error position.
//!
//! There is no automatic backtracking. Where two alternatives share a
//! prefix, opt in explicitly with [`attempt`](combinator::attempt), which
//! buffers the input it crosses and rewinds on failure. This one rule
//! keeps parsing linear-time without memoization and keeps error messages
//! anchored where the input actually diverged from the grammar.
//!
//! # Defining a parser
//!
//! Grammars are usually assembled from the building blocks in
//! [`combinator`], wrapped in small functions:
//!
//! ```
//! use descent::prelude::*;
//!
//! fn ident() -> impl Parser<char, Output = String> {
//!     many1(satisfy(|c: &char| c.is_ascii_alphanumeric() || *c == '_'))
//!         .map(|cs| cs.into_iter().collect())
//!         .labelled("identifier")
//! }
//!
//! assert_eq!(ident().parse("snake_case rest").unwrap(), "snake_case");
//! ```
//!
//! Custom behavior drops down to the same interface every built-in
//! combinator uses: implement [`Parser`] directly against [`ParseState`]
//! and the expectation buffer. The contract is spelled out on
//! [`Parser::try_parse`].
//!
//! Recursive grammars go through [`rec`](combinator::rec), which defers
//! construction of the inner parser until first use:
//!
//! ```
//! use descent::prelude::*;
//! use descent::BoxParser;
//!
//! // expr = digit | '(' expr ')'
//! fn expr() -> BoxParser<char, char> {
//!     satisfy(|c: &char| c.is_ascii_digit())
//!         .or(delimited(token('('), rec(expr), token(')')))
//!         .boxed()
//! }
//!
//! assert_eq!(expr().parse("((3))").unwrap(), '3');
//! ```
//!
//! # Errors
//!
//! Failures surface as [`ParseError`] values from [`Parser::parse`], never
//! as panics: the error records the unexpected token (or end of input),
//! the set of [`Expected`] items collected at the failure point, an
//! optional message, and the position reached, as a line/column
//! [`PosDelta`] from the start of the input. Rendering via
//! [`Display`](core::fmt::Display) produces the conventional multi-line
//! message.
//!
//! The exception is grammar bugs: a parser that succeeds without consuming
//! inside a repetition would loop forever, so repetition combinators panic
//! on it immediately rather than hang.

mod config;
mod error;
mod expected;
mod pool;
mod position;
mod source;
mod state;

pub mod combinator;
pub mod expr;
pub mod permutation;

pub use config::*;
pub use error::*;
pub use expected::*;
pub use pool::*;
pub use position::*;
pub use source::*;
pub use state::*;

use std::sync::Arc;

extern crate self as descent;

/// The `descent` prelude.
pub mod prelude {
    pub use super::combinator::{
        alt, any, attempt, bind, constant, current_offset, current_pos, current_pos_delta,
        delimited, either, end, fail, look_ahead, many, many1, many1_until, many_until, map,
        map2, map3, not, one_of, opt, pair, prefix, rec, repeat_string, repeated, satisfy,
        sep_by, sep_by1, sep_end_by, sep_end_by1, seq, skip_many, skip_many1, string, string_ci,
        suffix, token, verbatim, with_default, with_value,
    };
    pub use super::expr::{binary, expression, unary, OperatorRow};
    pub use super::permutation::PermutationParser;
    pub use super::{Config, Expected, ParseError, Parser, Position};
}

/// A heap-allocated, dynamically dispatched parser.
///
/// Boxing erases a parser's concrete type, which recursive grammars and
/// runtime-assembled operator tables need. Produced by [`Parser::boxed`].
pub type BoxParser<T, O> = Box<dyn Parser<T, Output = O>>;

/// The buffer parsers append their [`Expected`] items to while running.
pub type ExpectedSet<T> = PooledList<Expected<T>>;

/// Trait implemented by all parsers.
///
/// A parser is an immutable description of parsing intent over tokens of
/// type `T`: build it once, run it any number of times, share it freely
/// (including across threads, when its components allow). All mutation
/// during a run happens in the [`ParseState`].
pub trait Parser<T: Clone> {
    /// The value produced on success.
    type Output;

    /// Runs this parser against `state`.
    ///
    /// This is the single operation every combinator implements, and it
    /// must honor the following contract:
    ///
    /// * On success, return `Some(value)`. The parser may or may not have
    ///   advanced the state. Zero or more [`Expected`] items may be
    ///   appended to `expecteds`, describing what else could have matched
    ///   at the entry location.
    /// * On failure, return `None` after writing the error slot with
    ///   [`ParseState::set_error`] and appending the expectations that
    ///   describe what was wanted. The state must either be exactly where
    ///   it was on entry, or strictly advanced; enclosing choice
    ///   combinators dispatch on that difference. Never rewind here: going
    ///   backwards is the exclusive business of
    ///   [`attempt`](combinator::attempt) and friends, via bookmarks.
    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Self::Output>;

    /// Runs this parser over `input` with the default [`Config`].
    ///
    /// Consuming the whole input is not required; sequence with
    /// [`end`](combinator::end) when it should be.
    fn parse<N>(&self, input: N) -> Result<Self::Output, ParseError<T>>
    where
        N: IntoTokens<Token = T>,
        T: PartialEq,
        Self: Sized,
    {
        self.parse_with(input, &Config::default())
    }

    /// Runs this parser over `input` under the given configuration.
    fn parse_with<N>(&self, input: N, config: &Config<T>) -> Result<Self::Output, ParseError<T>>
    where
        N: IntoTokens<Token = T>,
        T: PartialEq,
        Self: Sized,
    {
        let mut state = ParseState::new(input.into_tokens(), config);
        let mut expecteds = state.rent_expecteds();
        match self.try_parse(&mut state, &mut expecteds) {
            Some(value) => Ok(value),
            None => Err(state.build_error(&expecteds)),
        }
    }

    /// Transforms this parser's output with a function.
    #[inline]
    fn map<F, R>(self, map_fn: F) -> impl Parser<T, Output = R>
    where
        F: Fn(Self::Output) -> R,
        Self: Sized,
    {
        combinator::map(self, map_fn)
    }

    /// Discards this parser's output and produces a clone of `value`.
    #[inline]
    fn with_value<V: Clone>(self, value: V) -> impl Parser<T, Output = V>
    where
        Self: Sized,
    {
        combinator::with_value(self, value)
    }

    /// Discards this parser's output and produces the target type's
    /// default value.
    #[inline]
    fn with_default<V: Default>(self) -> impl Parser<T, Output = V>
    where
        Self: Sized,
    {
        combinator::with_default(self)
    }

    /// Runs `self` then `next`, producing both outputs as a tuple.
    ///
    /// Keep one side only with [`prefix`](combinator::prefix) and
    /// [`suffix`](combinator::suffix); flatten longer runs with
    /// [`seq!`](combinator::seq).
    #[inline]
    fn then<Q>(self, next: Q) -> impl Parser<T, Output = (Self::Output, Q::Output)>
    where
        Q: Parser<T>,
        Self: Sized,
    {
        combinator::pair(self, next)
    }

    /// Feeds this parser's output into `next_fn` and runs the parser it
    /// returns. The gateway to context-sensitive grammars.
    #[inline]
    fn bind<F, Q>(self, next_fn: F) -> impl Parser<T, Output = Q::Output>
    where
        F: Fn(Self::Output) -> Q,
        Q: Parser<T>,
        Self: Sized,
    {
        combinator::bind(self, next_fn)
    }

    /// Tries `self`, then `other` if `self` failed without consuming.
    #[inline]
    fn or<Q>(self, other: Q) -> impl Parser<T, Output = Self::Output>
    where
        Q: Parser<T, Output = Self::Output>,
        Self: Sized,
    {
        combinator::either(self, other)
    }

    /// Turns a non-consuming failure of this parser into `None`.
    #[inline]
    fn opt(self) -> impl Parser<T, Output = Option<Self::Output>>
    where
        Self: Sized,
    {
        combinator::opt(self)
    }

    /// Applies this parser zero or more times, collecting the outputs.
    #[inline]
    fn many(self) -> impl Parser<T, Output = Vec<Self::Output>>
    where
        Self: Sized,
    {
        combinator::many(self)
    }

    /// Applies this parser one or more times, collecting the outputs.
    #[inline]
    fn many1(self) -> impl Parser<T, Output = Vec<Self::Output>>
    where
        Self: Sized,
    {
        combinator::many1(self)
    }

    /// Names this parser for error reporting.
    #[inline]
    fn labelled(self, name: impl Into<Arc<str>>) -> impl Parser<T, Output = Self::Output>
    where
        Self: Sized,
    {
        combinator::labelled(self, name)
    }

    /// Requires this parser's output to satisfy a predicate.
    #[inline]
    fn verify<F>(self, predicate: F) -> impl Parser<T, Output = Self::Output>
    where
        F: Fn(&Self::Output) -> bool,
        Self: Sized,
    {
        combinator::verify(self, predicate)
    }

    /// Like [`verify`](Parser::verify), with a message built from the
    /// rejected value.
    #[inline]
    fn verify_with<F, M>(self, predicate: F, message: M) -> impl Parser<T, Output = Self::Output>
    where
        F: Fn(&Self::Output) -> bool,
        M: Fn(&Self::Output) -> String,
        Self: Sized,
    {
        combinator::verify_with(self, predicate, message)
    }

    /// Hands failures of this parser to `handler`, which picks a recovery
    /// parser to run from the failure point.
    #[inline]
    fn recover_with<H, R>(self, handler: H) -> impl Parser<T, Output = Self::Output>
    where
        T: PartialEq,
        H: Fn(ParseError<T>) -> R,
        R: Parser<T, Output = Self::Output>,
        Self: Sized,
    {
        combinator::recover_with(self, handler)
    }

    /// Logs entry and outcome of this parser at trace level.
    #[inline]
    fn trace(self, label: impl Into<Arc<str>>) -> impl Parser<T, Output = Self::Output>
    where
        Self: Sized,
    {
        combinator::trace(self, label)
    }

    /// Erases this parser's concrete type behind a [`BoxParser`].
    #[inline]
    fn boxed(self) -> BoxParser<T, Self::Output>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}
