use core::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};

// Buffers beyond this count are dropped instead of recycled, so one
// pathological parse cannot pin memory for the life of the pool.
const MAX_POOLED: usize = 64;

/// A pool of reusable `Vec` allocations backing [`PooledList`].
///
/// Combinators that need a private expectation buffer rent one from the
/// pool and return it when done, so a parse performs a bounded number of
/// allocations no matter how many alternation points it visits. The pool
/// is thread-safe and is shared between parses through the
/// [`Config`](crate::Config) it was installed in.
#[derive(Debug)]
pub struct BufferPool<E> {
    free: Mutex<Vec<Vec<E>>>,
}

impl<E> BufferPool<E> {
    /// Creates an empty pool.
    pub fn new() -> BufferPool<E> {
        BufferPool {
            free: Mutex::new(Vec::new()),
        }
    }

    /// Rents a buffer from the pool, allocating a fresh one if the pool is
    /// empty. The buffer is returned to the pool when the [`PooledList`] is
    /// dropped, on every exit path.
    pub fn rent(self: &Arc<Self>) -> PooledList<E> {
        let items = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledList {
            items,
            pool: Arc::clone(self),
        }
    }

    fn restore(&self, mut items: Vec<E>) {
        items.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < MAX_POOLED {
            free.push(items);
        }
    }
}

impl<E> Default for BufferPool<E> {
    fn default() -> BufferPool<E> {
        BufferPool::new()
    }
}

/// A growable list whose backing storage is rented from a [`BufferPool`].
///
/// Dropping the list returns the storage to its pool. A `PooledList` is
/// not itself synchronized; it belongs to the single parse that rented it.
#[derive(Debug)]
pub struct PooledList<E> {
    items: Vec<E>,
    pool: Arc<BufferPool<E>>,
}

impl<E> PooledList<E> {
    /// Appends a single element.
    pub fn push(&mut self, item: E) {
        self.items.push(item);
    }

    /// Moves every element of `other` to the end of `self`, leaving `other`
    /// empty.
    pub fn append(&mut self, other: &mut PooledList<E>) {
        self.items.append(&mut other.items);
    }

    /// Removes all elements, keeping the storage.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Views the elements as a slice.
    pub fn as_slice(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E> Deref for PooledList<E> {
    type Target = [E];

    fn deref(&self) -> &[E] {
        &self.items
    }
}

impl<E> Drop for PooledList<E> {
    fn drop(&mut self) {
        self.pool.restore(core::mem::take(&mut self.items));
    }
}

impl<'a, E> IntoIterator for &'a PooledList<E> {
    type Item = &'a E;
    type IntoIter = core::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rented_storage_is_recycled() {
        let pool = Arc::new(BufferPool::new());
        {
            let mut list = pool.rent();
            list.push(1);
            list.push(2);
            assert_eq!(list.as_slice(), &[1, 2]);
        }
        let list: PooledList<i32> = pool.rent();
        assert!(list.is_empty());
        assert!(list.items.capacity() >= 2);
    }
}
