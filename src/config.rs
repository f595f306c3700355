use crate::{BufferPool, Expected, PosDelta};
use core::fmt;
use std::sync::Arc;

/// Per-parse configuration: position arithmetic and buffer pooling.
///
/// A `Config` is cheap to clone and safe to share between concurrent
/// parses; sharing one also shares its [`BufferPool`].
///
/// ```
/// use descent::{combinator::any, Config, Parser};
///
/// let newline_aware = Config::for_chars();
/// let parsed = any().parse_with("x", &newline_aware).unwrap();
/// assert_eq!(parsed, 'x');
/// ```
pub struct Config<T> {
    pos_calc: Arc<dyn Fn(&T) -> PosDelta + Send + Sync>,
    pool: Arc<BufferPool<Expected<T>>>,
}

impl<T> Config<T> {
    /// A configuration where every token advances the position by one
    /// column.
    pub fn new() -> Config<T> {
        Config {
            pos_calc: Arc::new(|_| PosDelta::ONE_COL),
            pool: Arc::new(BufferPool::new()),
        }
    }

    /// Replaces the position calculator: how far a single consumed token
    /// moves the source position.
    pub fn with_pos_calc(
        mut self,
        pos_calc: impl Fn(&T) -> PosDelta + Send + Sync + 'static,
    ) -> Config<T> {
        self.pos_calc = Arc::new(pos_calc);
        self
    }

    /// Replaces the pool backing transient expectation buffers.
    pub fn with_pool(mut self, pool: Arc<BufferPool<Expected<T>>>) -> Config<T> {
        self.pool = pool;
        self
    }

    pub(crate) fn pos_calc(&self) -> &Arc<dyn Fn(&T) -> PosDelta + Send + Sync> {
        &self.pos_calc
    }

    pub(crate) fn pool(&self) -> &Arc<BufferPool<Expected<T>>> {
        &self.pool
    }
}

impl Config<char> {
    /// A configuration for character input where `'\n'` moves to the start
    /// of the next line and every other character advances one column.
    pub fn for_chars() -> Config<char> {
        Config::new().with_pos_calc(|c| {
            if *c == '\n' {
                PosDelta::NEWLINE
            } else {
                PosDelta::ONE_COL
            }
        })
    }
}

impl<T> Default for Config<T> {
    fn default() -> Config<T> {
        Config::new()
    }
}

impl<T> Clone for Config<T> {
    fn clone(&self) -> Config<T> {
        Config {
            pos_calc: Arc::clone(&self.pos_calc),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<T> fmt::Debug for Config<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config").finish_non_exhaustive()
    }
}
