//! Order-insensitive composition.
//!
//! A [`PermutationParser`] runs a set of parsers in whatever order they
//! happen to match, each exactly once (or at most once, for optional
//! items, which fall back to a default). The builder is immutable:
//! [`add`](PermutationParser::add) and
//! [`add_optional`](PermutationParser::add_optional) return new builders,
//! and [`build`](PermutationParser::build) produces the parser.
//!
//! Outputs nest leftwards from a unit seed, one pair per added item:
//! `create().add(a).add(b).add(c)` produces `((((), A), B), C)`, to be
//! flattened with a final [`map`](crate::Parser::map).
//!
//! Every item must consume at least one token when it matches; an item
//! matching the empty input would make the permutation ambiguous. Items
//! are tried in the order they were added, so the first added parser wins
//! when two could match at the same place.
//!
//! ```
//! use descent::{combinator::{string, token}, permutation::PermutationParser, Parser};
//!
//! let mods = PermutationParser::create()
//!     .add(string("pub"))
//!     .add_optional(string("static"), String::new())
//!     .build()
//!     .map(|((_, vis), stat)| (vis, stat));
//!
//! let (vis, stat) = mods.parse("pub").unwrap();
//! assert_eq!((vis.as_str(), stat.as_str()), ("pub", ""));
//! ```

use crate::{ExpectedSet, Parser, ParseState};
use core::fmt;
use core::marker::PhantomData;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Nil {}
    impl<H, R> Sealed for super::Cons<H, R> {}
    impl<P> Sealed for super::Required<P> {}
    impl<P, V> Sealed for super::Optional<P, V> {}
}

/// What one scan over the pending items produced.
#[doc(hidden)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Some pending item matched; scan again from the top.
    Progress,
    /// Every pending item failed without consuming input.
    NoMatch,
    /// A pending item failed after consuming input.
    Failed,
}

/// The empty item list.
#[derive(Debug, Clone, Default)]
pub struct Nil;

/// A non-empty item list: the most recently added item plus the rest.
#[derive(Debug, Clone)]
pub struct Cons<H, R> {
    head: H,
    rest: R,
}

/// An item that must match exactly once.
#[derive(Debug, Clone)]
pub struct Required<P>(P);

/// An item that matches at most once, with a default for when it never
/// does.
#[derive(Debug, Clone)]
pub struct Optional<P, V>(P, V);

/// One slot of a permutation: a parser plus the policy for a missing
/// match.
#[doc(hidden)]
pub trait PermItem<T: Clone>: sealed::Sealed {
    type Value;

    fn try_head(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<Self::Value>;

    fn required(&self) -> bool;

    fn missing(&self) -> Option<Self::Value>;
}

impl<T: Clone, P: Parser<T>> PermItem<T> for Required<P> {
    type Value = P::Output;

    fn try_head(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<P::Output> {
        self.0.try_parse(state, expecteds)
    }

    fn required(&self) -> bool {
        true
    }

    fn missing(&self) -> Option<P::Output> {
        None
    }
}

impl<T: Clone, P, V> PermItem<T> for Optional<P, V>
where
    P: Parser<T, Output = V>,
    V: Clone,
{
    type Value = V;

    fn try_head(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<V> {
        self.0.try_parse(state, expecteds)
    }

    fn required(&self) -> bool {
        false
    }

    fn missing(&self) -> Option<V> {
        Some(self.1.clone())
    }
}

/// A typed list of permutation items, with the per-parse slot storage and
/// scan logic that goes with it.
#[doc(hidden)]
pub trait PermItems<T: Clone>: sealed::Sealed {
    type Output;
    type Slots: Default;

    /// Tries each still-pending item once, in the order they were added,
    /// stopping at the first match.
    fn try_step(
        &self,
        slots: &mut Self::Slots,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Step;

    /// Whether any required item is still unmatched.
    fn pending(&self, slots: &Self::Slots) -> bool;

    /// Assembles the output, substituting defaults for unmatched optional
    /// items. Only called once nothing required is pending.
    fn finish(&self, slots: Self::Slots) -> Self::Output;
}

impl<T: Clone> PermItems<T> for Nil {
    type Output = ();
    type Slots = ();

    fn try_step(
        &self,
        _slots: &mut (),
        _state: &mut ParseState<'_, T>,
        _expecteds: &mut ExpectedSet<T>,
    ) -> Step {
        Step::NoMatch
    }

    fn pending(&self, _slots: &()) -> bool {
        false
    }

    fn finish(&self, _slots: ()) {}
}

impl<T: Clone, H, R> PermItems<T> for Cons<H, R>
where
    H: PermItem<T>,
    R: PermItems<T>,
{
    type Output = (R::Output, H::Value);
    type Slots = (R::Slots, Option<H::Value>);

    fn try_step(
        &self,
        slots: &mut Self::Slots,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Step {
        // Earlier-added items live deeper in the list and get first go.
        match self.rest.try_step(&mut slots.0, state, expecteds) {
            Step::NoMatch => {}
            outcome => return outcome,
        }
        if slots.1.is_some() {
            return Step::NoMatch;
        }
        let start = state.location();
        let mut branch = state.rent_expecteds();
        let result = self.head.try_head(state, &mut branch);
        expecteds.append(&mut branch);
        match result {
            Some(value) => {
                slots.1 = Some(value);
                Step::Progress
            }
            None if state.location() == start => Step::NoMatch,
            None => Step::Failed,
        }
    }

    fn pending(&self, slots: &Self::Slots) -> bool {
        self.rest.pending(&slots.0) || (self.head.required() && slots.1.is_none())
    }

    fn finish(&self, slots: Self::Slots) -> Self::Output {
        let head = match slots.1 {
            Some(value) => value,
            None => match self.head.missing() {
                Some(default) => default,
                None => unreachable!("permutation finished with a required item unmatched"),
            },
        };
        (self.rest.finish(slots.0), head)
    }
}

/// An immutable builder for order-insensitive parsing. See the
/// [module documentation](self).
#[derive(Debug, Clone)]
pub struct PermutationParser<T, L> {
    items: L,
    _tokens: PhantomData<fn() -> T>,
}

impl<T: Clone> PermutationParser<T, Nil> {
    /// A permutation of no items. Add parsers with
    /// [`add`](PermutationParser::add) and
    /// [`add_optional`](PermutationParser::add_optional).
    pub fn create() -> PermutationParser<T, Nil> {
        PermutationParser {
            items: Nil,
            _tokens: PhantomData,
        }
    }
}

impl<T: Clone, L: PermItems<T>> PermutationParser<T, L> {
    /// Returns a new builder that also requires `parser` to match, once,
    /// anywhere in the permuted input.
    pub fn add<P: Parser<T>>(self, parser: P) -> PermutationParser<T, Cons<Required<P>, L>> {
        PermutationParser {
            items: Cons {
                head: Required(parser),
                rest: self.items,
            },
            _tokens: PhantomData,
        }
    }

    /// Returns a new builder that also allows `parser` to match, at most
    /// once; `default` stands in when it never does.
    pub fn add_optional<P: Parser<T>>(
        self,
        parser: P,
        default: P::Output,
    ) -> PermutationParser<T, Cons<Optional<P, P::Output>, L>>
    where
        P::Output: Clone,
    {
        PermutationParser {
            items: Cons {
                head: Optional(parser, default),
                rest: self.items,
            },
            _tokens: PhantomData,
        }
    }

    /// Compiles the builder into a parser.
    ///
    /// # Panics
    ///
    /// The built parser panics if an item succeeds without consuming
    /// input, like a repetition whose inner parser matches nothing.
    pub fn build(self) -> impl Parser<T, Output = L::Output> {
        PermParser {
            items: self.items,
            _tokens: PhantomData,
        }
    }
}

struct PermParser<T, L> {
    items: L,
    _tokens: PhantomData<fn() -> T>,
}

impl<T: Clone, L: PermItems<T>> Parser<T> for PermParser<T, L> {
    type Output = L::Output;

    fn try_parse(
        &self,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<L::Output> {
        let mut slots = L::Slots::default();
        loop {
            let start = state.location();
            let mut round = state.rent_expecteds();
            match self.items.try_step(&mut slots, state, &mut round) {
                Step::Progress => {
                    if state.location() == start {
                        panic!(
                            "permutation item succeeded without consuming input; \
                             this would make the permutation ambiguous"
                        );
                    }
                }
                Step::NoMatch => {
                    expecteds.append(&mut round);
                    if self.items.pending(&slots) {
                        return None;
                    }
                    return Some(self.items.finish(slots));
                }
                Step::Failed => {
                    expecteds.append(&mut round);
                    return None;
                }
            }
        }
    }
}

impl<T, L: fmt::Debug> fmt::Debug for PermParser<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermParser")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}
