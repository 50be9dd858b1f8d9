use std::any::type_name;
use std::fmt;
use std::iter;
use std::num::NonZero;

use crossbeam_utils::CachePadded;
use new_zealand::nz;
use tracing::{debug, trace, warn};

use crate::balance::{choose_less_loaded, pick_other_thread_local};
use crate::error::Result;
use crate::metrics::{GET_PRIVATE, GET_PRODUCED, GET_SHARED, PUT_DROPPED, PUT_PRIVATE, PUT_SHARED};
use crate::processors::{Processors, ProcessorsFacade, current_thread_slot};
use crate::shard::Shard;
use crate::{Error, PRIVATE_CAPACITY};

type Produce<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A thread-safe pool of reusable objects, sharded by processor.
///
/// [`get()`][Self::get] hands out a previously returned object if one is available near the
/// current processor and otherwise creates a new one with the factory given at construction.
/// [`put()`][Self::put] takes ownership of an object so a later `get()` can reuse it.
///
/// The pool is a cache, not a container. It makes no promise that any particular object is
/// ever handed out again: `get()` only looks at the shard of the current processor, and `put()`
/// silently drops objects once the pool is at capacity.
///
/// # Sharding
///
/// The pool has one shard per processor. Each shard keeps up to [`PRIVATE_CAPACITY`] objects
/// in a private array that is accessed without locking, plus a mutex-protected shared list for
/// overflow. When `put()` finds the private array full, it compares the shared list of the
/// current shard with that of one other shard picked at random and appends to the shorter one
/// ("power of two choices"). `get()` never looks beyond the current shard.
///
/// The number of processors is queried once, when the pool is created. Changing the number of
/// processors available to the process while the pool exists is not supported and will cause
/// a panic if a thread executes on a processor the pool does not know about.
///
/// # Capacity
///
/// An optional total capacity bounds the number of objects in the shared lists. It is divided
/// evenly between the shards, with every shard allowed at least one shared object. The
/// private arrays are in addition to this. The pool never shrinks: objects are only released
/// when handed out by `get()` or when the pool itself is dropped.
///
/// # Example
///
/// ```
/// use free_pool::FreePool;
///
/// let pool = FreePool::new(|| Vec::<u8>::with_capacity(4096));
///
/// let mut buffer = pool.get();
/// buffer.extend_from_slice(b"hello");
///
/// // Hand the buffer back for reuse. We can no longer touch it after this.
/// buffer.clear();
/// pool.put(buffer);
///
/// let buffer = pool.get();
/// assert!(buffer.capacity() >= 4096);
/// ```
///
/// # Thread safety
///
/// The pool is `Send` and `Sync` if `T` is `Send`. Share it between threads via `Arc` or
/// scoped threads.
pub struct FreePool<T> {
    produce: Produce<T>,

    // Exactly `shard_count` entries, never resized.
    shards: Box<[CachePadded<Shard<T>>]>,
    shard_count: NonZero<usize>,

    // Maximum length of each shard's shared list. `None` means unlimited.
    max_local_size: Option<usize>,

    shard_selector: ShardSelector,
}

/// How a pool decides which shard belongs to the current thread.
#[derive(Clone, Debug)]
enum ShardSelector {
    /// By the processor executing the thread, falling back to the thread slot if the platform
    /// does not say.
    Processor(ProcessorsFacade),

    /// By thread slot only, used when the pool does not know the processor count.
    Thread,
}

impl<T> FreePool<T> {
    /// Creates a pool without a capacity limit, using `produce` to create objects when the
    /// pool has none to hand out.
    ///
    /// The factory is never called while the pool holds a lock, so it may itself use the pool
    /// or take arbitrarily long.
    ///
    /// # Example
    ///
    /// ```
    /// use free_pool::FreePool;
    ///
    /// let pool = FreePool::new(|| vec![0_i64; 64]);
    /// assert_eq!(pool.get().len(), 64);
    /// ```
    #[must_use]
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder(produce).build()
    }

    /// Creates a pool that retains roughly `total_capacity` objects in the shared lists of its
    /// shards, on top of the small private array each shard has. Zero means no limit.
    ///
    /// # Example
    ///
    /// ```
    /// use free_pool::FreePool;
    ///
    /// let pool = FreePool::with_capacity(String::new, 1024);
    /// assert!(pool.max_local_size().is_some());
    /// ```
    #[must_use]
    pub fn with_capacity<F>(produce: F, total_capacity: usize) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::builder(produce).capacity(total_capacity).build()
    }

    /// Creates a builder for configuring a pool.
    ///
    /// # Example
    ///
    /// ```
    /// use free_pool::FreePool;
    ///
    /// let pool = FreePool::builder(|| [0_u8; 512]).capacity(64).try_build()?;
    /// pool.put(pool.get());
    /// # Ok::<(), free_pool::Error>(())
    /// ```
    pub fn builder<F>(produce: F) -> FreePoolBuilder<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        FreePoolBuilder::new(Box::new(produce))
    }

    fn from_parts(
        produce: Produce<T>,
        total_capacity: usize,
        shard_count: NonZero<usize>,
        shard_selector: ShardSelector,
    ) -> Self {
        let max_local_size = max_local_size(total_capacity, shard_count);

        let shards = iter::repeat_with(|| CachePadded::new(Shard::new()))
            .take(shard_count.get())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        debug!(
            item_type = type_name::<T>(),
            shard_count = shard_count.get(),
            ?max_local_size,
            "free pool created"
        );

        Self {
            produce,
            shards,
            shard_count,
            max_local_size,
            shard_selector,
        }
    }

    /// Takes an object out of the pool, creating a new one if the pool has none available
    /// for the current processor.
    ///
    /// The most recently returned object is handed out first. Objects returned on other
    /// processors are not considered, so a new object may be created even if the pool is
    /// not empty.
    ///
    /// # Panics
    ///
    /// Panics if the current thread is executing on a processor that did not exist when the
    /// pool was created. Panics from the factory are propagated unchanged.
    #[must_use]
    pub fn get(&self) -> T {
        let shard = self.shard(self.current_shard_index());

        if let Some(item) = shard.pop_private() {
            GET_PRIVATE.with(|e| e.observe_once());
            return item;
        }

        if let Some(item) = shard.pop_shared() {
            GET_SHARED.with(|e| e.observe_once());
            return item;
        }

        GET_PRODUCED.with(|e| e.observe_once());
        (self.produce)()
    }

    /// Returns an object to the pool so a later [`get()`][Self::get] can reuse it.
    ///
    /// Ownership passes to the pool unconditionally. If the pool is at capacity, the object
    /// is dropped right away; there is no way to tell whether that happened.
    ///
    /// # Panics
    ///
    /// Panics if the current thread is executing on a processor that did not exist when the
    /// pool was created.
    pub fn put(&self, item: T) {
        let current_index = self.current_shard_index();
        let current = self.shard(current_index);

        let Err(item) = current.push_private(item) else {
            PUT_PRIVATE.with(|e| e.observe_once());
            return;
        };

        let candidate_index = pick_other_thread_local(current_index, self.shard_count);

        // The lengths may be stale by the time we lock the target. That only affects balance,
        // as the capacity check is repeated under the lock.
        let target_index = choose_less_loaded(
            current_index,
            current.shared_len(),
            candidate_index,
            self.shard(candidate_index).shared_len(),
        );

        match self
            .shard(target_index)
            .push_shared(item, self.max_local_size)
        {
            Ok(()) => PUT_SHARED.with(|e| e.observe_once()),
            Err(item) => {
                PUT_DROPPED.with(|e| e.observe_once());
                trace!(shard = target_index, "shard at capacity, dropping returned object");

                // The lock has already been released, so dropping cannot block other threads.
                drop(item);
            }
        }
    }

    /// The number of objects currently held by the pool, summed over all shards.
    ///
    /// The shards are read one by one without synchronization, so the result is only exact
    /// when no other thread is using the pool. Intended for tests and diagnostics.
    #[must_use]
    pub fn approx_len(&self) -> usize {
        self.shards.iter().fold(0, |total, shard| {
            total
                .saturating_add(shard.private_len())
                .saturating_add(shard.shared_len())
        })
    }

    /// The number of shards, fixed when the pool was created.
    #[must_use]
    pub fn shard_count(&self) -> NonZero<usize> {
        self.shard_count
    }

    /// The maximum length of each shard's shared list, or `None` if unlimited.
    ///
    /// Each shard additionally holds up to [`PRIVATE_CAPACITY`] objects in its private array.
    #[must_use]
    pub fn max_local_size(&self) -> Option<usize> {
        self.max_local_size
    }

    #[inline]
    fn current_shard_index(&self) -> usize {
        match &self.shard_selector {
            ShardSelector::Processor(processors) => processors
                .current_processor_id()
                .unwrap_or_else(|| current_thread_slot() % self.shard_count),
            ShardSelector::Thread => current_thread_slot() % self.shard_count,
        }
    }

    #[inline]
    fn shard(&self, index: usize) -> &Shard<T> {
        self.shards.get(index).unwrap_or_else(|| {
            panic!(
                "processor {index} is outside the {} shards of the pool - the processor count must not change after the pool is created",
                self.shard_count
            )
        })
    }
}

impl<T> fmt::Debug for FreePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("shard_count", &self.shard_count)
            .field("max_local_size", &self.max_local_size)
            .field("approx_len", &self.approx_len())
            .finish_non_exhaustive()
    }
}

/// Divides a total capacity between shards. Zero means unlimited, otherwise every shard gets
/// at least one slot.
#[expect(
    clippy::integer_division,
    reason = "rounding down is intended, the minimum of one covers the remainder"
)]
#[expect(
    clippy::arithmetic_side_effects,
    reason = "division by zero excluded by NonZero"
)]
fn max_local_size(total_capacity: usize, shard_count: NonZero<usize>) -> Option<usize> {
    if total_capacity == 0 {
        return None;
    }

    Some((total_capacity / shard_count.get()).max(1))
}

/// Builder for creating an instance of [`FreePool`].
///
/// You only need to use this builder if you want to detect failures to determine the
/// processor count, via [`try_build()`][Self::try_build]. Otherwise, [`FreePool::new()`] and
/// [`FreePool::with_capacity()`] are equivalent and shorter.
///
/// # Example
///
/// ```
/// use free_pool::FreePool;
///
/// let pool = FreePool::builder(|| Box::new([0_u64; 32])).capacity(256).build();
///
/// let item = pool.get();
/// pool.put(item);
/// ```
#[must_use]
pub struct FreePoolBuilder<T> {
    produce: Produce<T>,
    total_capacity: usize,
    processors: ProcessorsFacade,
}

impl<T> fmt::Debug for FreePoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("total_capacity", &self.total_capacity)
            .field("processors", &self.processors)
            .finish_non_exhaustive()
    }
}

impl<T> FreePoolBuilder<T> {
    fn new(produce: Produce<T>) -> Self {
        Self {
            produce,
            total_capacity: 0,
            processors: ProcessorsFacade::target(),
        }
    }

    /// Sets the total number of objects the shared lists of all shards may hold together.
    ///
    /// The value is divided evenly between shards, rounding down but never below one per shard.
    /// Zero (the default) means no limit. Every shard can also hold [`PRIVATE_CAPACITY`]
    /// objects in its private array, which does not count against this limit.
    pub fn capacity(mut self, total_capacity: usize) -> Self {
        self.total_capacity = total_capacity;
        self
    }

    #[cfg(test)]
    pub(crate) fn processors(mut self, processors: ProcessorsFacade) -> Self {
        self.processors = processors;
        self
    }

    /// Builds the pool, using a single shard if the processor count cannot be determined.
    ///
    /// With a single shard, the pool is still correct but all threads contend for the same
    /// shard. A warning is logged when this happens.
    #[must_use]
    pub fn build(self) -> FreePool<T> {
        match self.processors.processor_count() {
            Ok(shard_count) => FreePool::from_parts(
                self.produce,
                self.total_capacity,
                shard_count,
                ShardSelector::Processor(self.processors),
            ),
            Err(error) => {
                warn!(
                    %error,
                    "unable to determine the processor count - free pool falls back to a single shard"
                );

                FreePool::from_parts(
                    self.produce,
                    self.total_capacity,
                    nz!(1),
                    ShardSelector::Thread,
                )
            }
        }
    }

    /// Builds the pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProcessorCountUnavailable`] if the number of processors, and therefore
    /// the number of shards, cannot be determined.
    pub fn try_build(self) -> Result<FreePool<T>> {
        let shard_count = self
            .processors
            .processor_count()
            .map_err(|source| Error::ProcessorCountUnavailable { source })?;

        Ok(FreePool::from_parts(
            self.produce,
            self.total_capacity,
            shard_count,
            ShardSelector::Processor(self.processors),
        ))
    }
}

// Each shard must be able to hold at least one object without locking.
const _: () = assert!(PRIVATE_CAPACITY > 0);

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::collections::HashSet;
    use std::io;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::processors::MockProcessors;

    assert_impl_all!(FreePool<Vec<u8>>: Send, Sync);
    assert_not_impl_any!(FreePool<std::rc::Rc<u8>>: Send, Sync);

    thread_local! {
        // The shard that the mock processor queries report for the current thread.
        static TEST_PROCESSOR: Cell<usize> = const { Cell::new(0) };
    }

    fn place_current_thread_on(processor: usize) {
        TEST_PROCESSOR.with(|p| p.set(processor));
    }

    /// Mock processors that place each thread on the processor most recently given to
    /// `place_current_thread_on()` by that thread. Resets the current thread to processor 0.
    fn mock_processors(count: usize) -> ProcessorsFacade {
        place_current_thread_on(0);

        let mut mock = MockProcessors::new();

        mock.expect_processor_count()
            .returning(move || Ok(NonZero::new(count).unwrap()));
        mock.expect_current_processor_id()
            .returning(|| Some(TEST_PROCESSOR.with(Cell::get)));

        ProcessorsFacade::from_mock(mock)
    }

    /// Creates a pool of numbered items over `shards` mock processors. Produced items are
    /// numbered from `PRODUCED_BASE` upwards, so they are distinguishable from items the test
    /// puts into the pool itself.
    fn numbered_pool(shards: usize, total_capacity: usize) -> (FreePool<usize>, Arc<AtomicUsize>) {
        let produced = Arc::new(AtomicUsize::new(0));

        let pool = FreePool::builder({
            let produced = Arc::clone(&produced);
            move || PRODUCED_BASE + produced.fetch_add(1, Ordering::Relaxed)
        })
        .capacity(total_capacity)
        .processors(mock_processors(shards))
        .build();

        (pool, produced)
    }

    const PRODUCED_BASE: usize = 1_000_000;

    #[test]
    fn max_local_size_zero_is_unbounded() {
        assert_eq!(max_local_size(0, nz!(4)), None);
    }

    #[test]
    fn max_local_size_divides_between_shards() {
        assert_eq!(max_local_size(8, nz!(4)), Some(2));
        assert_eq!(max_local_size(9, nz!(4)), Some(2));
        assert_eq!(max_local_size(100, nz!(1)), Some(100));
    }

    #[test]
    fn max_local_size_is_at_least_one() {
        assert_eq!(max_local_size(3, nz!(4)), Some(1));
        assert_eq!(max_local_size(1, nz!(64)), Some(1));
    }

    #[test]
    fn builder_uses_processor_count() {
        let (pool, _) = numbered_pool(3, 30);

        assert_eq!(pool.shard_count().get(), 3);
        assert_eq!(pool.max_local_size(), Some(10));
    }

    #[test]
    fn build_falls_back_to_single_shard() {
        let mut mock = MockProcessors::new();
        mock.expect_processor_count()
            .returning(|| Err(io::Error::other("no processors for you")));

        let pool = FreePool::builder(|| 5_u32)
            .processors(ProcessorsFacade::from_mock(mock))
            .build();

        assert_eq!(pool.shard_count().get(), 1);

        pool.put(6);
        assert_eq!(pool.get(), 6);
        assert_eq!(pool.get(), 5);
    }

    #[test]
    fn try_build_reports_missing_processor_count() {
        let mut mock = MockProcessors::new();
        mock.expect_processor_count()
            .returning(|| Err(io::Error::other("no processors for you")));

        let result = FreePool::builder(|| 5_u32)
            .processors(ProcessorsFacade::from_mock(mock))
            .try_build();

        assert!(matches!(
            result,
            Err(Error::ProcessorCountUnavailable { .. })
        ));
    }

    #[test]
    fn unknown_processor_falls_back_to_thread_slot() {
        let mut mock = MockProcessors::new();
        mock.expect_processor_count().returning(|| Ok(nz!(2)));
        mock.expect_current_processor_id().returning(|| None);

        let pool = FreePool::builder(|| 0_u32)
            .processors(ProcessorsFacade::from_mock(mock))
            .build();

        // The thread slot is stable, so this thread consistently lands on the same shard.
        pool.put(1);
        assert_eq!(pool.get(), 1);
        assert_eq!(pool.get(), 0);
    }

    #[test]
    fn get_on_empty_pool_produces() {
        let (pool, produced) = numbered_pool(4, 0);

        assert_eq!(pool.get(), PRODUCED_BASE);
        assert_eq!(pool.get(), PRODUCED_BASE + 1);

        assert_eq!(produced.load(Ordering::Relaxed), 2);
        assert_eq!(pool.approx_len(), 0);
    }

    #[test]
    fn put_then_get_round_trips() {
        let (pool, produced) = numbered_pool(4, 0);
        place_current_thread_on(2);

        pool.put(7);
        assert_eq!(pool.get(), 7);

        assert_eq!(produced.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn private_array_is_lifo() {
        let (pool, _) = numbered_pool(4, 0);
        place_current_thread_on(1);

        for i in 0..PRIVATE_CAPACITY {
            pool.put(i);
        }

        for i in (0..PRIVATE_CAPACITY).rev() {
            assert_eq!(pool.get(), i);
        }

        assert_eq!(pool.get(), PRODUCED_BASE);
    }

    #[test]
    fn single_shard_never_loses_objects() {
        let (pool, produced) = numbered_pool(1, 0);

        for i in 0..100 {
            pool.put(i);
        }

        assert_eq!(pool.approx_len(), 100);

        let mut seen = HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(pool.get()));
        }

        assert_eq!(seen, (0..100).collect());
        assert_eq!(produced.load(Ordering::Relaxed), 0);

        assert_eq!(pool.get(), PRODUCED_BASE);
    }

    #[test]
    fn overflow_lands_on_current_or_one_other_shard() {
        let (pool, _) = numbered_pool(4, 0);
        place_current_thread_on(0);

        // Fill the private array, then one overflow object.
        for i in 0..=PRIVATE_CAPACITY {
            pool.put(i);
        }

        assert_eq!(pool.approx_len(), PRIVATE_CAPACITY + 1);

        // All shared lists were empty, so the tie keeps the overflow on the current shard.
        assert_eq!(pool.shards[0].shared_len(), 1);
        assert_eq!(pool.shards[0].private_len(), PRIVATE_CAPACITY);
    }

    #[test]
    fn overflow_prefers_shorter_shared_list() {
        let (pool, _) = numbered_pool(2, 0);
        place_current_thread_on(0);

        for i in 0..PRIVATE_CAPACITY {
            pool.put(i);
        }

        // With two shards, the "other" shard is always shard 1. Shard 0 starts with the
        // overflow, after which the shorter list alternates.
        for i in 0..10 {
            pool.put(100 + i);
        }

        let len0 = pool.shards[0].shared_len();
        let len1 = pool.shards[1].shared_len();

        assert_eq!(len0 + len1, 10);
        assert!(len0.abs_diff(len1) <= 1, "shared lists {len0} and {len1}");
    }

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn put_drops_objects_at_capacity() {
        let dropped = Arc::new(AtomicUsize::new(0));

        let pool = FreePool::builder({
            let dropped = Arc::clone(&dropped);
            move || Tracked(Arc::clone(&dropped))
        })
        .capacity(1)
        .processors(mock_processors(1))
        .build();

        for _ in 0..PRIVATE_CAPACITY + 3 {
            pool.put(Tracked(Arc::clone(&dropped)));
        }

        // Private array plus one shared slot are retained, the rest are dropped immediately.
        assert_eq!(pool.approx_len(), PRIVATE_CAPACITY + 1);
        assert_eq!(dropped.load(Ordering::Relaxed), 2);

        drop(pool);

        // Dropping the pool drops everything it held.
        assert_eq!(dropped.load(Ordering::Relaxed), PRIVATE_CAPACITY + 3);
    }

    #[test]
    fn get_does_not_look_at_other_shards() {
        let (pool, _) = numbered_pool(2, 0);

        place_current_thread_on(0);
        pool.put(42);

        place_current_thread_on(1);
        assert_eq!(pool.get(), PRODUCED_BASE);

        place_current_thread_on(0);
        assert_eq!(pool.get(), 42);
    }

    #[test]
    fn get_falls_back_to_shared_list_of_current_shard() {
        let (pool, _) = numbered_pool(1, 0);

        for i in 0..PRIVATE_CAPACITY + 2 {
            pool.put(i);
        }

        // Private array first (most recent private push first), then the shared list.
        for i in (0..PRIVATE_CAPACITY).rev() {
            assert_eq!(pool.get(), i);
        }

        assert_eq!(pool.get(), PRIVATE_CAPACITY + 1);
        assert_eq!(pool.get(), PRIVATE_CAPACITY);
        assert_eq!(pool.get(), PRODUCED_BASE);
    }

    #[test]
    #[should_panic]
    fn processor_outside_shards_panics() {
        let (pool, _) = numbered_pool(4, 0);
        place_current_thread_on(4);

        pool.put(1);
    }

    #[test]
    fn panicking_factory_leaves_pool_usable() {
        let calls = Arc::new(AtomicUsize::new(0));

        let pool = FreePool::builder({
            let calls = Arc::clone(&calls);
            move || {
                assert!(calls.fetch_add(1, Ordering::Relaxed) != 0, "first call fails");
                7_u32
            }
        })
        .processors(mock_processors(1))
        .build();

        let result = panic::catch_unwind(AssertUnwindSafe(|| pool.get()));
        assert!(result.is_err());

        pool.put(3);
        assert_eq!(pool.get(), 3);
        assert_eq!(pool.get(), 7);
    }

    #[test]
    fn approx_len_counts_private_and_shared() {
        let (pool, _) = numbered_pool(3, 0);

        for processor in 0..3 {
            place_current_thread_on(processor);

            for i in 0..PRIVATE_CAPACITY + processor {
                pool.put(i);
            }
        }

        assert_eq!(pool.approx_len(), 3 * PRIVATE_CAPACITY + 3);

        place_current_thread_on(0);
        _ = pool.get();

        assert_eq!(pool.approx_len(), 3 * PRIVATE_CAPACITY + 2);
    }

    #[test]
    fn debug_output_mentions_configuration() {
        let (pool, _) = numbered_pool(2, 10);

        let output = format!("{pool:?}");

        assert!(output.contains("shard_count: 2"), "{output}");
        assert!(output.contains("max_local_size: Some(5)"), "{output}");
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn concurrent_puts_respect_capacity_and_get_reuses() {
        const SHARDS: usize = 4;
        const TOTAL_CAPACITY: usize = 8;
        const PUTS: usize = 40;

        let (pool, produced) = numbered_pool(SHARDS, TOTAL_CAPACITY);
        assert_eq!(pool.max_local_size(), Some(2));

        let pool = Arc::new(pool);
        let barrier = Arc::new(Barrier::new(SHARDS));

        // Four callers, one per shard, each putting a distinct range of objects.
        let handles = (0..SHARDS)
            .map(|processor| {
                let pool = Arc::clone(&pool);
                let barrier = Arc::clone(&barrier);

                thread::spawn(move || {
                    place_current_thread_on(processor);
                    barrier.wait();

                    for i in 0..PUTS / SHARDS {
                        pool.put(processor * 100 + i);

                        assert!(pool.approx_len() <= SHARDS * PRIVATE_CAPACITY + TOTAL_CAPACITY);
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        let retained = pool.approx_len();
        assert!(retained >= SHARDS * PRIVATE_CAPACITY);
        assert!(retained <= SHARDS * PRIVATE_CAPACITY + TOTAL_CAPACITY);

        for shard in &pool.shards {
            assert_eq!(shard.private_len(), PRIVATE_CAPACITY);
            assert!(shard.shared_len() <= 2);
        }

        // Every shard hands out what it holds before producing anything new.
        for processor in 0..SHARDS {
            let pool = Arc::clone(&pool);

            thread::spawn(move || {
                place_current_thread_on(processor);

                let held = pool.shards[processor].private_len() + pool.shards[processor].shared_len();

                for _ in 0..held {
                    assert!(pool.get() < PRODUCED_BASE);
                }

                assert!(pool.get() >= PRODUCED_BASE);
            })
            .join()
            .unwrap();
        }

        assert_eq!(pool.approx_len(), 0);
        assert_eq!(produced.load(Ordering::Relaxed), SHARDS);
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn concurrent_churn_never_exceeds_limits() {
        const SHARDS: usize = 4;
        const THREADS: usize = 16;
        const ITERATIONS: usize = 2000;

        let (pool, _) = numbered_pool(SHARDS, 12);
        let pool = Arc::new(pool);

        let handles = (0..THREADS)
            .map(|thread_index| {
                let pool = Arc::clone(&pool);

                thread::spawn(move || {
                    // More threads than shards, so threads share shards and pins collide.
                    place_current_thread_on(thread_index % SHARDS);

                    let mut held = Vec::new();

                    for i in 0..ITERATIONS {
                        if i % 3 == 0 {
                            held.push(pool.get());
                        } else {
                            pool.put(i);
                        }

                        for shard in &pool.shards {
                            assert!(shard.shared_len() <= 3);
                        }
                    }

                    for item in held {
                        pool.put(item);
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(pool.approx_len() <= SHARDS * PRIVATE_CAPACITY + 12);
    }
}
