use std::any::type_name;
use std::fmt;

use crate::DEFAULT_LOCAL_POOL_CAPACITY;

/// A pool of reusable objects owned by a single thread.
///
/// This has the same contract as [`FreePool`][crate::FreePool] - [`get()`][Self::get] reuses
/// a returned object or creates a new one, [`put()`][Self::put] hands an object back and
/// drops it if the pool is full - but requires exclusive access, so it needs neither atomics
/// nor locks. Use it when the recycling happens entirely within one thread, for example as a
/// field of a single-threaded worker.
///
/// Unlike `FreePool`, the length is exact and no object is ever dropped while there is room.
///
/// # Example
///
/// ```
/// use free_pool::LocalPool;
///
/// let mut pool = LocalPool::with_capacity(|| Vec::<u32>::with_capacity(100), 2);
///
/// let mut numbers = pool.get();
/// numbers.push(42);
/// numbers.clear();
/// pool.put(numbers);
///
/// assert_eq!(pool.len(), 1);
/// assert!(pool.get().capacity() >= 100);
/// assert!(pool.is_empty());
/// ```
pub struct LocalPool<T> {
    produce: Box<dyn Fn() -> T>,
    items: Vec<T>,
    max_size: usize,
}

impl<T> LocalPool<T> {
    /// Creates a pool that retains up to [`DEFAULT_LOCAL_POOL_CAPACITY`] objects.
    #[must_use]
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::with_capacity(produce, DEFAULT_LOCAL_POOL_CAPACITY)
    }

    /// Creates a pool that retains up to `max_size` objects. With a `max_size` of zero, the
    /// pool retains nothing and every `get()` creates a new object.
    #[must_use]
    pub fn with_capacity<F>(produce: F, max_size: usize) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            produce: Box::new(produce),
            items: Vec::new(),
            max_size,
        }
    }

    /// Takes the most recently returned object out of the pool, creating a new one if the pool
    /// is empty.
    #[must_use]
    pub fn get(&mut self) -> T {
        self.items.pop().unwrap_or_else(|| (self.produce)())
    }

    /// Returns an object to the pool, dropping it if the pool is full.
    pub fn put(&mut self, item: T) {
        if self.items.len() < self.max_size {
            self.items.push(item);
        }
    }

    /// The number of objects in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the pool has no objects to hand out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The maximum number of objects the pool retains.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl<T> fmt::Debug for LocalPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("len", &self.items.len())
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}
