use core::cmp::Ordering;
use core::fmt;
use std::sync::Arc;

/// A description of what a parser was looking for at its failure point.
///
/// Expectations are collected while parsing and reported through
/// [`ParseError::expected`](crate::ParseError::expected) when the overall
/// parse fails. Three kinds exist: a human-readable label (attached with
/// [`Parser::labelled`](crate::Parser::labelled)), a literal token sequence
/// the parser tried to match, and end-of-input.
#[derive(Debug, Clone)]
pub enum Expected<T> {
    /// A named grammar production, e.g. `"identifier"`.
    Label(Arc<str>),
    /// A literal token sequence, e.g. the characters of a keyword.
    Tokens(Arc<[T]>),
    /// The end of the input.
    Eof,
}

impl<T> Expected<T> {
    /// An expectation carrying a human-readable name.
    pub fn label(name: impl Into<Arc<str>>) -> Expected<T> {
        Expected::Label(name.into())
    }

    /// An expectation for a literal token sequence.
    pub fn tokens(tokens: impl Into<Arc<[T]>>) -> Expected<T> {
        Expected::Tokens(tokens.into())
    }

    /// An expectation for the end of the input.
    pub fn eof() -> Expected<T> {
        Expected::Eof
    }

    fn rank(&self) -> u8 {
        match self {
            Expected::Label(_) => 0,
            Expected::Tokens(_) => 1,
            Expected::Eof => 2,
        }
    }
}

impl<T: PartialEq> PartialEq for Expected<T> {
    fn eq(&self, other: &Expected<T>) -> bool {
        match (self, other) {
            (Expected::Label(a), Expected::Label(b)) => a == b,
            (Expected::Tokens(a), Expected::Tokens(b)) => a[..] == b[..],
            (Expected::Eof, Expected::Eof) => true,
            _ => false,
        }
    }
}

impl<T: Eq> Eq for Expected<T> {}

impl<T: Ord> PartialOrd for Expected<T> {
    fn partial_cmp(&self, other: &Expected<T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Labels order before token sequences, which order before end-of-input;
/// labels compare by string and token sequences element-wise.
impl<T: Ord> Ord for Expected<T> {
    fn cmp(&self, other: &Expected<T>) -> Ordering {
        match (self, other) {
            (Expected::Label(a), Expected::Label(b)) => a.cmp(b),
            (Expected::Tokens(a), Expected::Tokens(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Expected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Label(name) => f.write_str(name),
            Expected::Tokens(tokens) => {
                f.write_str("\"")?;
                for token in tokens.iter() {
                    write!(f, "{token}")?;
                }
                f.write_str("\"")
            }
            Expected::Eof => f.write_str("end of input"),
        }
    }
}
