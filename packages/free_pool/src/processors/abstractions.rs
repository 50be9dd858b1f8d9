use std::fmt::Debug;
use std::io;
use std::num::NonZero;

/// Queries about the processors of the system the pool is running on.
///
/// Every processor query made by a pool goes through this trait, enabling it to be mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Processors: Debug + Send + Sync + 'static {
    /// The number of processors, such that every ID returned by `current_processor_id()` is
    /// less than this number. Queried once per pool, at construction.
    fn processor_count(&self) -> Result<NonZero<usize>, io::Error>;

    /// The ID of the processor executing the current thread, or `None` if the platform cannot
    /// tell. The thread may have moved to another processor by the time the caller looks at
    /// the returned value.
    fn current_processor_id(&self) -> Option<usize>;
}
