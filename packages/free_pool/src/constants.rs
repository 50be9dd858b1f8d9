/// How many objects each shard keeps in its private array.
///
/// The private array is accessed without taking a lock, so it serves as the fast path for both
/// [`FreePool::get()`][crate::FreePool::get] and [`FreePool::put()`][crate::FreePool::put].
/// Objects that do not fit go to the shard's lock-protected shared list.
pub const PRIVATE_CAPACITY: usize = 4;

/// The cache line size we assume when reasoning about false sharing between shards.
///
/// The shards themselves are padded by [`crossbeam_utils::CachePadded`], which may pick a larger
/// padding on platforms where adjacent cache lines are prefetched together. The padded size is
/// always a multiple of this value.
pub const CACHE_LINE_SIZE: usize = 64;

/// The number of objects a [`LocalPool`][crate::LocalPool] retains unless told otherwise.
pub const DEFAULT_LOCAL_POOL_CAPACITY: usize = 128;
