//! Error types for the [`scan`](super) module.
//!
//! Every one of these is recovered inside a scan: the item is skipped or
//! stored with filesystem fields only, and the message becomes a diagnostic.
//! Only a denied lease stops a scan, and that is reported as an
//! [`AbortReason`](super::AbortReason), not an error.

use audiohub_storage::lease::Denial;
use derive_more::{Display, Error};
use std::path::PathBuf;
use std::time::Duration;

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a per-item scan failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Classification`]
/// - [`ErrorKind::Timeout`]
/// - [`ErrorKind::Lease`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::Extract`]
/// - [`ErrorKind::Cache`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A file whose folder was never seen as a book (including files directly
    /// beneath the library root).
    #[display("no book folder for {}", _0.display())]
    Classification(#[error(not(source))] PathBuf),
    /// Extraction took longer than the configured limit.
    #[display("extraction timed out after {}s", _0.as_secs())]
    Timeout(#[error(not(source))] Duration),
    /// Per-file access was refused.
    #[display("access denied: {_0}")]
    Lease(#[error(not(source))] Denial),
    /// Reading the file from the storage backend failed.
    #[display("failed to read from storage")]
    Storage,
    /// Tag parsing failed.
    #[display("failed to extract metadata")]
    Extract,
    /// A read or write against the library store failed.
    #[display("library store update failed")]
    Cache,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Storage | Self::Cache)
    }
}
