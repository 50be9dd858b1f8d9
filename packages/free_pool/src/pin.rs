use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// A value that at most one thread may access at a time, without ever waiting for access.
///
/// Access is obtained by pinning the cell via [`try_pin()`][PinCell::try_pin]. If another thread
/// holds the pin, the attempt fails immediately instead of blocking, and the caller is expected
/// to continue on some other path. The pin is released when the returned [`Pinned`] guard is
/// dropped.
///
/// This is how a shard grants its private array to the thread currently executing on the
/// shard's processor. Normally only one thread at a time runs on a processor, so the pin is
/// uncontended and costs one atomic exchange. A thread that migrated between processors in
/// the middle of an operation may find the pin taken, which is harmless.
pub(crate) struct PinCell<T> {
    pinned: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: The cell owns the value and moving the cell moves the value, which is fine if T: Send.
unsafe impl<T: Send> Send for PinCell<T> {}

// SAFETY: A shared reference only gives access to the value through `try_pin()`, which grants
// exclusive access to one thread at a time. This is the same contract as a mutex, so T: Send
// is sufficient.
unsafe impl<T: Send> Sync for PinCell<T> {}

impl<T> PinCell<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self {
            pinned: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Attempts to obtain exclusive access to the value.
    ///
    /// Returns `None` if some other thread is currently holding the pin.
    #[inline]
    pub(crate) fn try_pin(&self) -> Option<Pinned<'_, T>> {
        // Acquire on success pairs with the Release in `Pinned::drop()`, so we observe every
        // write the previous holder made to the value.
        // The guard must only come into existence on success, as dropping it releases the pin.
        if self
            .pinned
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(Pinned { cell: self })
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn is_pinned(&self) -> bool {
        self.pinned.load(Ordering::Relaxed)
    }
}

/// Exclusive access to the value of a [`PinCell`], released on drop.
pub(crate) struct Pinned<'a, T> {
    cell: &'a PinCell<T>,
}

impl<T> Deref for Pinned<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: We hold the pin, so nobody else is accessing the value.
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> DerefMut for Pinned<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: We hold the pin, so nobody else is accessing the value.
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<T> Drop for Pinned<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.cell.pinned.store(false, Ordering::Release);
    }
}
