#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and examples in the `free_pool` package.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// Runs a test on a separate thread and panics if it does not finish within a time limit.
///
/// Pool tests hammer the same locks from many threads, so a locking bug shows up as a hang.
/// The watchdog turns such a hang into a test failure instead of a stuck build.
///
/// The limit is 10 seconds, or 60 seconds under Miri. When the `MUTATION_TESTING` environment
/// variable is set to "1", the watchdog is disabled so that mutation testing can detect
/// hanging mutations on its own terms.
///
/// # Panics
///
/// Panics if the test exceeds the time limit. Panics from the test itself are propagated.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If the receiver is gone, the watchdog already gave up on us.
        drop(tx.send(result));
    });

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            test_handle.join().expect("test thread already reported success");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded the {timeout:?} watchdog limit - is a pool lock stuck?");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread exited without reporting a result"),
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}

/// A factory for pool tests that numbers the objects it creates and counts how many it made.
///
/// Produced numbers start at [`CountingFactory::FIRST`], which is far above any number a test
/// would put into a pool by hand. This makes it easy to tell recycled objects from new ones.
///
/// Clones share the same counter.
///
/// # Example
///
/// ```rust
/// use testing::CountingFactory;
///
/// let factory = CountingFactory::new();
/// let produce = factory.produce_fn();
///
/// assert_eq!(produce(), CountingFactory::FIRST);
/// assert!(CountingFactory::is_produced(produce()));
/// assert_eq!(factory.produced(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CountingFactory {
    produced: Arc<AtomicUsize>,
}

impl CountingFactory {
    /// The number given to the first produced object.
    pub const FIRST: usize = 1_000_000_000;

    /// Creates a factory that has not produced anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a function that produces the next number each time it is called.
    #[must_use]
    pub fn produce_fn(&self) -> impl Fn() -> usize + Send + Sync + 'static {
        let produced = Arc::clone(&self.produced);

        move || {
            Self::FIRST
                .checked_add(produced.fetch_add(1, Ordering::Relaxed))
                .expect("tests never produce anywhere near usize::MAX objects")
        }
    }

    /// How many objects have been produced so far.
    #[must_use]
    pub fn produced(&self) -> usize {
        self.produced.load(Ordering::Relaxed)
    }

    /// Whether `value` came from a factory rather than from a test's own numbering.
    #[must_use]
    pub fn is_produced(value: usize) -> bool {
        value >= Self::FIRST
    }
}
