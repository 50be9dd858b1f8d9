//! Metrics for the free pool.
//!
//! Every `get()` observes exactly one of the `GET_*` events and every `put()` exactly one of the
//! `PUT_*` events, depending on where the object came from or went to. Comparing these counts
//! shows how well the pool is sized for the workload. The events use per-thread instances to
//! minimize contention.

use nm::Event;

thread_local! {
    /// `get()` was served from the private array of the current shard.
    pub(crate) static GET_PRIVATE: Event = Event::builder()
        .name("free_pool_get_private")
        .build();

    /// `get()` was served from the shared list of the current shard.
    pub(crate) static GET_SHARED: Event = Event::builder()
        .name("free_pool_get_shared")
        .build();

    /// `get()` found the current shard empty and created a new object.
    pub(crate) static GET_PRODUCED: Event = Event::builder()
        .name("free_pool_get_produced")
        .build();

    /// `put()` stored the object in the private array of the current shard.
    pub(crate) static PUT_PRIVATE: Event = Event::builder()
        .name("free_pool_put_private")
        .build();

    /// `put()` stored the object in the shared list of the less loaded of two shards.
    pub(crate) static PUT_SHARED: Event = Event::builder()
        .name("free_pool_put_shared")
        .build();

    /// `put()` dropped the object because the chosen shard was at capacity.
    pub(crate) static PUT_DROPPED: Event = Event::builder()
        .name("free_pool_put_dropped")
        .build();
}
