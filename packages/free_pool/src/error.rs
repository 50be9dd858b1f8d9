use std::io;

use thiserror::Error;

/// Errors that can occur when building a [`FreePool`][crate::FreePool].
///
/// Once a pool exists, none of its operations fail: running out of capacity silently drops
/// objects and a broken processor count assumption is a panic, not an error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The number of processors could not be determined, so the pool cannot decide how many
    /// shards to create.
    #[error("unable to determine the number of processors: {source}")]
    ProcessorCountUnavailable {
        /// The error reported by the operating system.
        #[source]
        source: io::Error,
    },
}

/// A specialized `Result` type for pool construction, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
