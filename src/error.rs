use crate::{Expected, PosDelta, Position};
use core::fmt;
use itertools::{Itertools, Position as ItemPos};
use std::sync::Arc;

/// A structured parse failure.
///
/// A `ParseError` records what the parser ran into (`unexpected` /
/// [`at_eof`](ParseError::at_eof)), everything it would have accepted
/// instead ([`expected`](ParseError::expected)), where it happened
/// ([`pos_delta`](ParseError::pos_delta), measured from the start of the
/// input), and an optional free-form message from [`fail`](crate::combinator::fail)
/// or [`verify_with`](crate::Parser::verify_with).
///
/// The [`Display`](fmt::Display) impl renders the conventional multi-line
/// message; programs that want to produce their own diagnostics should read
/// the fields instead, as the rendering is not a stable contract.
#[derive(Debug, Clone)]
pub struct ParseError<T> {
    unexpected: Option<T>,
    at_eof: bool,
    expected: Vec<Expected<T>>,
    pos_delta: PosDelta,
    message: Option<Arc<str>>,
}

impl<T> ParseError<T> {
    pub(crate) fn new(
        unexpected: Option<T>,
        at_eof: bool,
        expected: Vec<Expected<T>>,
        pos_delta: PosDelta,
        message: Option<Arc<str>>,
    ) -> ParseError<T> {
        ParseError {
            unexpected,
            at_eof,
            expected,
            pos_delta,
            message,
        }
    }

    /// The token the parser saw but did not want, if any.
    pub fn unexpected(&self) -> Option<&T> {
        self.unexpected.as_ref()
    }

    /// Whether the parser ran out of input.
    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// Everything the parser would have accepted at the failure point.
    ///
    /// Order is not meaningful; equality of errors treats this as a
    /// multiset.
    pub fn expected(&self) -> &[Expected<T>] {
        &self.expected
    }

    /// Movement from the start of the input to the failure point.
    pub fn pos_delta(&self) -> PosDelta {
        self.pos_delta
    }

    /// The failure point as a 1-based line/column position.
    pub fn position(&self) -> Position {
        Position::START + self.pos_delta
    }

    /// The free-form message, if the failure carries one.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl<T: PartialEq> PartialEq for ParseError<T> {
    fn eq(&self, other: &ParseError<T>) -> bool {
        self.unexpected == other.unexpected
            && self.at_eof == other.at_eof
            && self.pos_delta == other.pos_delta
            && self.message == other.message
            && multiset_eq(&self.expected, &other.expected)
    }
}

impl<T: Eq> Eq for ParseError<T> {}

// Order-independent comparison. Expectation sets are tiny, so the
// quadratic scan beats sorting (which would also demand `T: Ord`).
fn multiset_eq<E: PartialEq>(a: &[E], b: &[E]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut matched = vec![false; b.len()];
    'outer: for item in a {
        for (idx, other) in b.iter().enumerate() {
            if !matched[idx] && item == other {
                matched[idx] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

impl<T: fmt::Display> fmt::Display for ParseError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Parse error.")?;
        if let Some(message) = &self.message {
            write!(f, "\n    {message}")?;
        }
        if let Some(token) = &self.unexpected {
            write!(f, "\n    unexpected \"{token}\"")?;
        } else if self.at_eof {
            f.write_str("\n    unexpected end of input")?;
        }
        if !self.expected.is_empty() {
            f.write_str("\n    expected ")?;
            for (pos, expected) in self.expected.iter().with_position() {
                match pos {
                    ItemPos::First | ItemPos::Only => {}
                    ItemPos::Middle => f.write_str(", ")?,
                    ItemPos::Last => f.write_str(", or ")?,
                }
                write!(f, "{expected}")?;
            }
        }
        write!(f, "\n    at {}", self.position())
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for ParseError<T> {}
