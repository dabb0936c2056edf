//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Almost nothing inside a scan is
//! fatal; see [`scan::error`](crate::scan::error) for the per-item failures
//! that are recovered and reported instead.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The scan task went away without reporting how it ended (it panicked
    /// or the runtime shut down underneath it).
    #[display("scan stopped without reporting an outcome")]
    Interrupted,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
