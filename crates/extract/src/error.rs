//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. A failed extraction is never fatal to a scan; these
//! exist so the reason can be logged and kept as a diagnostic.

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading the underlying bytes failed.
    #[display("I/O error while reading tags: {_0}")]
    Io(#[error(not(source))] String),
    /// The content isn't a container format that can carry tags.
    #[display("unrecognised audio format")]
    UnsupportedFormat,
    /// The format was recognised but its tags or stream info are corrupt.
    #[display("failed to decode audio file: {_0}")]
    Decode(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Corrupt files stay corrupt; only the read itself can be retried.
        matches!(self, Self::Io(_))
    }
}
