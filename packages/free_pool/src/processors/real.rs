use std::fmt::Debug;
use std::io;
use std::num::NonZero;

use crate::processors::Processors;

/// Processor queries answered by the operating system that the build is targeting.
///
/// On Linux, the current processor is reported by `sched_getcpu()`. Elsewhere the current
/// processor is unknown and the pool falls back to sharding by thread.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetProcessors;

// Real OS queries are excluded from coverage measurement because their error paths require
// OS-level failures that are impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Processors for BuildTargetProcessors {
    #[cfg(target_os = "linux")]
    #[cfg_attr(test, mutants::skip)] // Only meaningful against the real OS, see integration tests.
    fn processor_count(&self) -> Result<NonZero<usize>, io::Error> {
        // We want the configured count, not the online count or the affinity mask size.
        // `sched_getcpu()` may return any configured processor ID, even when this process is
        // limited to a subset of processors.
        // SAFETY: No safety requirements.
        let count = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };

        // Negative means the query failed.
        let Ok(count) = usize::try_from(count) else {
            return Err(io::Error::last_os_error());
        };

        NonZero::new(count).ok_or_else(|| io::Error::other("the system reported zero processors"))
    }

    #[cfg(not(target_os = "linux"))]
    fn processor_count(&self) -> Result<NonZero<usize>, io::Error> {
        std::thread::available_parallelism()
    }

    #[cfg(target_os = "linux")]
    #[cfg_attr(test, mutants::skip)] // Only meaningful against the real OS, see integration tests.
    #[inline]
    fn current_processor_id(&self) -> Option<usize> {
        // SAFETY: No safety requirements.
        let id = unsafe { libc::sched_getcpu() };

        // Negative means the query failed (e.g. unsupported by the kernel).
        usize::try_from(id).ok()
    }

    #[cfg(not(target_os = "linux"))]
    #[inline]
    fn current_processor_id(&self) -> Option<usize> {
        None
    }
}
