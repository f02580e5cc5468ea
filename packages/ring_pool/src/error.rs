use thiserror::Error;

/// Errors that can occur when creating a pool.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller asked for a pool that can hold zero items.
    ///
    /// Such a pool would be permanently exhausted, which is never what anyone wants.
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,

    /// The backing storage for the requested number of items would not fit in the
    /// address space.
    #[error("pool capacity {capacity} exceeds the maximum size of a single allocation")]
    CapacityOverflow {
        /// The capacity that was requested.
        capacity: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
