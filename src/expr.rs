//! Operator-precedence expression parsing.
//!
//! [`expression`] builds an expression grammar out of a term parser and a
//! table of operator rows, ordered from loosest-binding to tightest. Each
//! [`OperatorRow`] groups the operators of one precedence level by fixity
//! and associativity; the builder takes care of the climbing, the folds,
//! and the usual ambiguities.
//!
//! Operator parsers produce the function to apply: a [`BinOp`] for infix
//! operators and a [`UnOp`] for prefix and postfix operators, typically
//! built with [`binary`] and [`unary`] and attached via
//! [`with_value`](crate::Parser::with_value).
//!
//! ```
//! use descent::{combinator::{satisfy, token}, expr::{binary, expression, OperatorRow}, Parser};
//!
//! let digit = satisfy(|c: &char| c.is_ascii_digit()).map(|c| c as i64 - '0' as i64);
//! let table = vec![
//!     OperatorRow::new().infix_l(token('+').with_value(binary(|x, y| x + y))),
//!     OperatorRow::new().infix_l(token('*').with_value(binary(|x, y| x * y))),
//! ];
//!
//! let arith = expression(digit, table);
//! assert_eq!(arith.parse("2+3*4").unwrap(), 14);
//! assert_eq!(arith.parse("2*3+4").unwrap(), 10);
//! ```

use crate::combinator::{many1, run_alternatives};
use crate::{BoxParser, ExpectedSet, Parser, ParseState};
use core::fmt;
use std::sync::Arc;

/// A binary operator: the function an infix operator parser produces.
pub type BinOp<O> = Arc<dyn Fn(O, O) -> O + Send + Sync>;

/// A unary operator: the function a prefix or postfix operator parser
/// produces.
pub type UnOp<O> = Arc<dyn Fn(O) -> O + Send + Sync>;

/// Wraps a plain function as a [`BinOp`].
pub fn binary<O>(f: impl Fn(O, O) -> O + Send + Sync + 'static) -> BinOp<O> {
    Arc::new(f)
}

/// Wraps a plain function as a [`UnOp`].
pub fn unary<O>(f: impl Fn(O) -> O + Send + Sync + 'static) -> UnOp<O> {
    Arc::new(f)
}

/// The operators of one precedence level.
///
/// Within a row, alternatives of the same bucket are tried in the order
/// they were added. Every bucket may be empty.
pub struct OperatorRow<T, O> {
    infix_n: Vec<BoxParser<T, BinOp<O>>>,
    infix_l: Vec<BoxParser<T, BinOp<O>>>,
    infix_r: Vec<BoxParser<T, BinOp<O>>>,
    prefix: Vec<BoxParser<T, UnOp<O>>>,
    postfix: Vec<BoxParser<T, UnOp<O>>>,
}

impl<T: Clone + 'static, O: 'static> OperatorRow<T, O> {
    /// A row with no operators.
    pub fn new() -> OperatorRow<T, O> {
        OperatorRow {
            infix_n: Vec::new(),
            infix_l: Vec::new(),
            infix_r: Vec::new(),
            prefix: Vec::new(),
            postfix: Vec::new(),
        }
    }

    /// Adds a non-associative infix operator: at most one occurrence per
    /// level, so `a < b < c` does not parse.
    pub fn infix_n(mut self, op: impl Parser<T, Output = BinOp<O>> + 'static) -> Self {
        self.infix_n.push(op.boxed());
        self
    }

    /// Adds a left-associative infix operator: `a - b - c` parses as
    /// `(a - b) - c`.
    pub fn infix_l(mut self, op: impl Parser<T, Output = BinOp<O>> + 'static) -> Self {
        self.infix_l.push(op.boxed());
        self
    }

    /// Adds a right-associative infix operator: `a ^ b ^ c` parses as
    /// `a ^ (b ^ c)`.
    pub fn infix_r(mut self, op: impl Parser<T, Output = BinOp<O>> + 'static) -> Self {
        self.infix_r.push(op.boxed());
        self
    }

    /// Adds a prefix operator, applied at most once per operand.
    pub fn prefix(mut self, op: impl Parser<T, Output = UnOp<O>> + 'static) -> Self {
        self.prefix.push(op.boxed());
        self
    }

    /// Adds a prefix operator that may occur several times in a row,
    /// applied innermost-first: `- - x` is `-(-x)`.
    pub fn prefix_chainable(mut self, op: impl Parser<T, Output = UnOp<O>> + 'static) -> Self {
        self.prefix.push(chain_unary(op, Fold::RightToLeft));
        self
    }

    /// Adds a postfix operator, applied at most once per operand.
    pub fn postfix(mut self, op: impl Parser<T, Output = UnOp<O>> + 'static) -> Self {
        self.postfix.push(op.boxed());
        self
    }

    /// Adds a postfix operator that may occur several times in a row,
    /// applied left-to-right: `x!!` is `(x!)!`.
    pub fn postfix_chainable(mut self, op: impl Parser<T, Output = UnOp<O>> + 'static) -> Self {
        self.postfix.push(chain_unary(op, Fold::LeftToRight));
        self
    }
}

impl<T: Clone + 'static, O: 'static> Default for OperatorRow<T, O> {
    fn default() -> Self {
        OperatorRow::new()
    }
}

impl<T, O> fmt::Debug for OperatorRow<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRow")
            .field("infix_n", &self.infix_n.len())
            .field("infix_l", &self.infix_l.len())
            .field("infix_r", &self.infix_r.len())
            .field("prefix", &self.prefix.len())
            .field("postfix", &self.postfix.len())
            .finish()
    }
}

enum Fold {
    RightToLeft,
    LeftToRight,
}

// One or more occurrences of a unary operator composed into a single
// application, so the level logic only ever applies one function per
// operand.
fn chain_unary<T: Clone + 'static, O: 'static>(
    op: impl Parser<T, Output = UnOp<O>> + 'static,
    fold: Fold,
) -> BoxParser<T, UnOp<O>> {
    match fold {
        Fold::RightToLeft => many1(op)
            .map(|fs: Vec<UnOp<O>>| -> UnOp<O> {
                Arc::new(move |x| fs.iter().rev().fold(x, |acc, f| f(acc)))
            })
            .boxed(),
        Fold::LeftToRight => many1(op)
            .map(|fs: Vec<UnOp<O>>| -> UnOp<O> {
                Arc::new(move |x| fs.iter().fold(x, |acc, f| f(acc)))
            })
            .boxed(),
    }
}

/// An operator-precedence expression parser. See [`expression`].
pub struct ExpressionParser<T, O> {
    term: BoxParser<T, O>,
    rows: Vec<OperatorRow<T, O>>,
}

/// Builds an expression parser from a term parser and a precedence table,
/// ordered from lowest (loosest-binding) row to highest.
///
/// Each operand of a level is the level above, optionally wrapped in that
/// level's prefix and postfix operators; the term parser sits above the
/// last row. See the [module documentation](self) for an example.
pub fn expression<T, O>(
    term: impl Parser<T, Output = O> + 'static,
    rows: Vec<OperatorRow<T, O>>,
) -> ExpressionParser<T, O>
where
    T: Clone + 'static,
    O: 'static,
{
    ExpressionParser {
        term: term.boxed(),
        rows,
    }
}

enum OpAttempt<V> {
    Matched(V),
    NoMatch,
    Failed,
}

// Optionally match one operator from a bucket, with the usual choice
// rules: a failure that consumed input is a real failure, not an absent
// operator.
fn attempt_ops<T: Clone, V>(
    ops: &[BoxParser<T, V>],
    state: &mut ParseState<'_, T>,
    expecteds: &mut ExpectedSet<T>,
) -> OpAttempt<V> {
    if ops.is_empty() {
        return OpAttempt::NoMatch;
    }
    let start = state.location();
    let mut branch = state.rent_expecteds();
    let result = run_alternatives(ops, state, &mut branch);
    expecteds.append(&mut branch);
    match result {
        Some(op) => OpAttempt::Matched(op),
        None if state.location() == start => OpAttempt::NoMatch,
        None => OpAttempt::Failed,
    }
}

impl<T: Clone, O> ExpressionParser<T, O> {
    fn parse_level(
        &self,
        level: usize,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<O> {
        let Some(row) = self.rows.get(level) else {
            return self.term.try_parse(state, expecteds);
        };

        let lhs = self.parse_operand(level, state, expecteds)?;

        match attempt_ops(&row.infix_n, state, expecteds) {
            OpAttempt::Matched(f) => {
                let rhs = self.parse_operand(level, state, expecteds)?;
                return Some(f(lhs, rhs));
            }
            OpAttempt::Failed => return None,
            OpAttempt::NoMatch => {}
        }

        let mut value = lhs;
        let mut chained_left = false;
        loop {
            match attempt_ops(&row.infix_l, state, expecteds) {
                OpAttempt::Matched(f) => {
                    chained_left = true;
                    let rhs = self.parse_operand(level, state, expecteds)?;
                    value = f(value, rhs);
                }
                OpAttempt::Failed => return None,
                OpAttempt::NoMatch => break,
            }
        }
        if chained_left {
            return Some(value);
        }

        let mut ops: Vec<BinOp<O>> = Vec::new();
        let mut operands: Vec<O> = Vec::new();
        loop {
            match attempt_ops(&row.infix_r, state, expecteds) {
                OpAttempt::Matched(f) => {
                    let rhs = self.parse_operand(level, state, expecteds)?;
                    ops.push(f);
                    operands.push(rhs);
                }
                OpAttempt::Failed => return None,
                OpAttempt::NoMatch => break,
            }
        }
        // Right fold: a ^ b ^ c groups as a ^ (b ^ c).
        if let Some(mut acc) = operands.pop() {
            while let Some(y) = operands.pop() {
                if let Some(f) = ops.pop() {
                    acc = f(y, acc);
                }
            }
            if let Some(f) = ops.pop() {
                value = f(value, acc);
            }
        }
        Some(value)
    }

    fn parse_operand(
        &self,
        level: usize,
        state: &mut ParseState<'_, T>,
        expecteds: &mut ExpectedSet<T>,
    ) -> Option<O> {
        let row = &self.rows[level];
        let pre = match attempt_ops(&row.prefix, state, expecteds) {
            OpAttempt::Matched(f) => Some(f),
            OpAttempt::NoMatch => None,
            OpAttempt::Failed => return None,
        };
        let value = self.parse_level(level + 1, state, expecteds)?;
        let post = match attempt_ops(&row.postfix, state, expecteds) {
            OpAttempt::Matched(f) => Some(f),
            OpAttempt::NoMatch => None,
            OpAttempt::Failed => return None,
        };
        let value = match pre {
            Some(f) => f(value),
            None => value,
        };
        let value = match post {
            Some(g) => g(value),
            None => value,
        };
        Some(value)
    }
}

impl<T: Clone, O> Parser<T> for ExpressionParser<T, O> {
    type Output = O;

    fn try_parse(&self, state: &mut ParseState<'_, T>, expecteds: &mut ExpectedSet<T>) -> Option<O> {
        self.parse_level(0, state, expecteds)
    }
}

impl<T, O> fmt::Debug for ExpressionParser<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionParser")
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}
