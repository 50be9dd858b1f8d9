use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::PRIVATE_CAPACITY;
use crate::pin::PinCell;

type PrivateSlots<T> = heapless::Vec<T, PRIVATE_CAPACITY>;

/// One processor-affine partition of a [`FreePool`][crate::FreePool].
///
/// A shard has two storage areas:
///
/// 1. A small private array that is accessed without a lock by whichever thread manages to pin
///    the shard. In practice, this is the thread executing on the shard's processor.
/// 2. A shared list of unbounded length (subject to the pool's capacity limit), guarded by a
///    mutex. Any thread may push into or pop from it.
///
/// Both areas behave as LIFO stacks. The lengths of both are mirrored in atomics so that other
/// threads can read them without pinning or locking. These reads are only used for load
/// balancing and diagnostics; whether an object fits is always decided under the pin or lock.
///
/// The pool wraps every shard in `CachePadded`, so the counters of neighboring shards never
/// share a cache line.
pub(crate) struct Shard<T> {
    private: PinCell<PrivateSlots<T>>,

    // == private.len(), written only while pinned.
    private_len: AtomicUsize,

    shared: Mutex<Vec<T>>,

    // == shared.len(), written only under the lock but readable without it.
    shared_len: AtomicUsize,
}

impl<T> Shard<T> {
    pub(crate) fn new() -> Self {
        Self {
            private: PinCell::new(PrivateSlots::new()),
            private_len: AtomicUsize::new(0),
            shared: Mutex::new(Vec::new()),
            shared_len: AtomicUsize::new(0),
        }
    }

    /// Takes the most recently stored object from the private array.
    ///
    /// Returns `None` if the private array is empty or another thread is holding the pin.
    #[inline]
    pub(crate) fn pop_private(&self) -> Option<T> {
        let mut slots = self.private.try_pin()?;

        // Popping moves the object out, so the slot no longer references it.
        let item = slots.pop()?;
        self.private_len.store(slots.len(), Ordering::Relaxed);

        Some(item)
    }

    /// Stores an object in the private array.
    ///
    /// Hands the object back if the private array is full or another thread is holding the pin.
    #[inline]
    pub(crate) fn push_private(&self, item: T) -> Result<(), T> {
        let Some(mut slots) = self.private.try_pin() else {
            return Err(item);
        };

        slots.push(item)?;
        self.private_len.store(slots.len(), Ordering::Relaxed);

        Ok(())
    }

    /// Takes the most recently stored object from the shared list.
    pub(crate) fn pop_shared(&self) -> Option<T> {
        let mut shared = self.shared.lock();

        let item = shared.pop()?;
        self.shared_len.store(shared.len(), Ordering::Release);

        Some(item)
    }

    /// Appends an object to the shared list if the list is shorter than `max_len`.
    ///
    /// `None` means the list has no length limit. Hands the object back if it does not fit.
    pub(crate) fn push_shared(&self, item: T, max_len: Option<usize>) -> Result<(), T> {
        let mut shared = self.shared.lock();

        if max_len.is_some_and(|max_len| shared.len() >= max_len) {
            return Err(item);
        }

        shared.push(item);

        // Release: anyone who observes the new length also observes the populated slot.
        self.shared_len.store(shared.len(), Ordering::Release);

        Ok(())
    }

    /// The length of the shared list, as of some recent point in time.
    #[inline]
    pub(crate) fn shared_len(&self) -> usize {
        self.shared_len.load(Ordering::Acquire)
    }

    /// The length of the private array, as of some recent point in time.
    #[inline]
    pub(crate) fn private_len(&self) -> usize {
        self.private_len.load(Ordering::Relaxed)
    }
}

impl<T> fmt::Debug for Shard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shard")
            .field("private_len", &self.private_len())
            .field("shared_len", &self.shared_len())
            .finish_non_exhaustive()
    }
}
