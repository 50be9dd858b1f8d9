//! Identification of the processor executing the current thread.
//!
//! All queries go through the [`Processors`] trait so that unit tests can substitute a mock
//! and place threads on specific shards. Production code always uses
//! [`ProcessorsFacade::target()`].

mod abstractions;
mod facade;
mod real;

use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) use abstractions::*;
pub(crate) use facade::*;
pub(crate) use real::*;

static NEXT_THREAD_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    // Assigned on first use. Threads created one after another get consecutive slots, which
    // spreads them evenly over the shards of any pool.
    static THREAD_SLOT: usize = NEXT_THREAD_SLOT.fetch_add(1, Ordering::Relaxed);
}

/// A stable number identifying the current thread, for use where the current processor is
/// unknown. Slots are not bounded by the processor count; callers reduce them as needed.
#[inline]
pub(crate) fn current_thread_slot() -> usize {
    THREAD_SLOT.with(|slot| *slot)
}
