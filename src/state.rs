use crate::{BufferPool, Config, Expected, ExpectedSet, ParseError, PosDelta};
use std::sync::Arc;

/// The mutable cursor a parse runs against.
///
/// A `ParseState` wraps a token source with a growable look-ahead buffer,
/// tracks the cursor location and its line/column movement, and carries the
/// error slot that [`build_error`](ParseState::build_error) materializes
/// into a [`ParseError`] when the top-level parse fails.
///
/// One `ParseState` serves exactly one top-level parse. Parsers themselves
/// are immutable descriptions; all mutation during a parse happens here.
///
/// # Bookmarks
///
/// Backtracking is explicit. [`push_bookmark`](ParseState::push_bookmark)
/// snapshots the cursor, [`rewind`](ParseState::rewind) restores the most
/// recent snapshot, and [`pop_bookmark`](ParseState::pop_bookmark) discards
/// it while keeping the cursor where it is. While any bookmark is active
/// the buffer retains every token from the earliest bookmark onwards;
/// tokens in front of that are released and their position deltas folded
/// into a running base, so position lookups stay exact without holding the
/// whole input.
pub struct ParseState<'src, T> {
    source: Box<dyn Iterator<Item = T> + 'src>,
    buffer: Vec<T>,
    // Absolute index of buffer[0]; the cursor and all bookmarks are
    // absolute indices at or past this.
    buffer_start: usize,
    location: usize,
    // Movement from the start of the input to buffer_start.
    base_delta: PosDelta,
    bookmarks: Vec<usize>,
    slot: Option<ErrorSlot<T>>,
    pos_calc: Arc<dyn Fn(&T) -> PosDelta + Send + Sync>,
    pool: Arc<BufferPool<Expected<T>>>,
}

struct ErrorSlot<T> {
    unexpected: Option<T>,
    at_eof: bool,
    location: usize,
    message: Option<Arc<str>>,
}

impl<'src, T> ParseState<'src, T> {
    /// Creates a state reading from `tokens` under `config`.
    ///
    /// Most callers go through [`Parser::parse`](crate::Parser::parse) or
    /// [`Parser::parse_with`](crate::Parser::parse_with) instead;
    /// constructing the state directly is for custom top-level drivers.
    pub fn new<I>(tokens: I, config: &Config<T>) -> ParseState<'src, T>
    where
        I: Iterator<Item = T> + 'src,
    {
        ParseState {
            source: Box::new(tokens.fuse()),
            buffer: Vec::new(),
            buffer_start: 0,
            location: 0,
            base_delta: PosDelta::ZERO,
            bookmarks: Vec::new(),
            slot: None,
            pos_calc: Arc::clone(config.pos_calc()),
            pool: Arc::clone(config.pool()),
        }
    }

    /// The cursor's absolute token index. Never decreases except through
    /// [`rewind`](ParseState::rewind).
    pub fn location(&self) -> usize {
        self.location
    }

    /// Whether a token is available at the cursor.
    pub fn has_current(&mut self) -> bool {
        self.fill_to(self.location + 1);
        self.location - self.buffer_start < self.buffer.len()
    }

    /// The token at the cursor, if any.
    pub fn current(&mut self) -> Option<&T> {
        self.fill_to(self.location + 1);
        self.buffer.get(self.location - self.buffer_start)
    }

    /// Up to `n` tokens beginning at the cursor. Shorter iff the input
    /// ends first. Does not move the cursor.
    pub fn look_ahead(&mut self, n: usize) -> &[T] {
        self.fill_to(self.location + n);
        let offset = self.location - self.buffer_start;
        let end = usize::min(offset + n, self.buffer.len());
        &self.buffer[offset..end]
    }

    /// Moves the cursor forward over `n` buffered tokens (fewer if the
    /// input ends first), folding their position deltas into the running
    /// position.
    pub fn advance(&mut self, n: usize) {
        self.fill_to(self.location + n);
        let offset = self.location - self.buffer_start;
        let n = usize::min(n, self.buffer.len() - offset);
        self.location += n;
        self.release();
    }

    /// Snapshots the cursor, pinning the buffer from this point on.
    pub fn push_bookmark(&mut self) {
        self.bookmarks.push(self.location);
    }

    /// Restores the cursor to the most recent bookmark and drops that
    /// bookmark.
    ///
    /// # Panics
    ///
    /// Panics if no bookmark is active; bookmark calls must be balanced.
    pub fn rewind(&mut self) {
        self.location = self
            .bookmarks
            .pop()
            .expect("rewind without an active bookmark");
    }

    /// Drops the most recent bookmark without moving the cursor.
    ///
    /// # Panics
    ///
    /// Panics if no bookmark is active; bookmark calls must be balanced.
    pub fn pop_bookmark(&mut self) {
        self.bookmarks
            .pop()
            .expect("pop_bookmark without an active bookmark");
        self.release();
    }

    /// Writes the error slot. Every failing parser calls this before
    /// returning; only the value present when the top-level parse returns
    /// failure is meaningful.
    pub fn set_error(
        &mut self,
        unexpected: Option<T>,
        at_eof: bool,
        location: usize,
        message: Option<Arc<str>>,
    ) {
        self.slot = Some(ErrorSlot {
            unexpected,
            at_eof,
            location,
            message,
        });
    }

    /// Movement from the start of the input to the cursor.
    pub fn source_pos_delta(&self) -> PosDelta {
        self.source_pos_delta_at(self.location)
    }

    /// Movement from the start of the input to the given absolute index.
    ///
    /// The index must not precede the earliest retained token; indices past
    /// the buffered region are treated as the end of it.
    pub fn source_pos_delta_at(&self, location: usize) -> PosDelta {
        debug_assert!(location >= self.buffer_start);
        let count = usize::min(
            location.saturating_sub(self.buffer_start),
            self.buffer.len(),
        );
        self.buffer[..count]
            .iter()
            .fold(self.base_delta, |delta, token| {
                delta + (self.pos_calc)(token)
            })
    }

    /// Rents a fresh expectation buffer from the configured pool.
    pub fn rent_expecteds(&self) -> ExpectedSet<T> {
        self.pool.rent()
    }

    fn fill_to(&mut self, location: usize) {
        while self.buffer_start + self.buffer.len() < location {
            match self.source.next() {
                Some(token) => self.buffer.push(token),
                None => break,
            }
        }
    }

    // Drop tokens no bookmark or cursor can reach again, folding their
    // deltas into base_delta.
    fn release(&mut self) {
        let keep = self.bookmarks.first().copied().unwrap_or(self.location);
        let count = keep - self.buffer_start;
        if count == 0 {
            return;
        }
        for token in self.buffer.drain(..count) {
            self.base_delta = self.base_delta + (self.pos_calc)(&token);
        }
        self.buffer_start = keep;
    }
}

impl<'src, T: Clone + PartialEq> ParseState<'src, T> {
    /// Materializes a [`ParseError`] from the error slot, the given
    /// expectation buffer (deduplicated), and the position delta at the
    /// recorded error location.
    pub fn build_error(&self, expecteds: &ExpectedSet<T>) -> ParseError<T> {
        let mut expected: Vec<Expected<T>> = Vec::with_capacity(expecteds.len());
        for item in expecteds {
            if !expected.contains(item) {
                expected.push(item.clone());
            }
        }
        match &self.slot {
            Some(slot) => ParseError::new(
                slot.unexpected.clone(),
                slot.at_eof,
                expected,
                self.source_pos_delta_at(slot.location),
                slot.message.clone(),
            ),
            None => ParseError::new(None, false, expected, self.source_pos_delta(), None),
        }
    }
}

impl<'src, T: core::fmt::Debug> core::fmt::Debug for ParseState<'src, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParseState")
            .field("location", &self.location)
            .field("buffer_start", &self.buffer_start)
            .field("buffered", &self.buffer.len())
            .field("bookmarks", &self.bookmarks)
            .finish_non_exhaustive()
    }
}
