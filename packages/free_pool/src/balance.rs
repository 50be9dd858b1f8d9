//! Power-of-two load balancing across shards.
//!
//! When the current shard has no room in its private array, the object goes to the shared list
//! of one of two candidates: the current shard or one other shard chosen at random, whichever
//! has the shorter shared list. Sampling two candidates instead of one bounds the imbalance
//! between shards at `O(log log n)` instead of `O(log n)` for `n` shards, without the cost of
//! inspecting every shard.
//!
//! The functions here are independent of the pool and take the random number generator as a
//! parameter, so the policy can be simulated deterministically.

use std::cell::RefCell;
use std::num::NonZero;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

thread_local! {
    // Load balancing needs speed, not unpredictability, so a small non-cryptographic generator
    // seeded once per thread is enough.
    static BALANCER_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_rng(&mut rand::rng()));
}

/// Picks a shard uniformly at random among all shards except `current`.
///
/// If there is only one shard, returns `current` because there is no other candidate.
#[must_use]
pub(crate) fn pick_other<R>(rng: &mut R, current: usize, shard_count: NonZero<usize>) -> usize
where
    R: Rng,
{
    let Some(others) = NonZero::new(shard_count.get().saturating_sub(1)) else {
        return current;
    };

    let candidate = rng.random_range(0..others.get());

    // Skip over the current shard to keep the distribution uniform over the others.
    if candidate >= current {
        candidate.saturating_add(1)
    } else {
        candidate
    }
}

/// Picks a shard with the thread-local balancer RNG. See [`pick_other()`].
#[must_use]
pub(crate) fn pick_other_thread_local(current: usize, shard_count: NonZero<usize>) -> usize {
    BALANCER_RNG.with_borrow_mut(|rng| pick_other(rng, current, shard_count))
}

/// Decides between the current shard and another candidate, given the (possibly stale) lengths
/// of their shared lists. Ties keep the current shard.
#[must_use]
#[inline]
pub(crate) fn choose_less_loaded(
    current: usize,
    current_len: usize,
    candidate: usize,
    candidate_len: usize,
) -> usize {
    if candidate_len < current_len {
        candidate
    } else {
        current
    }
}
