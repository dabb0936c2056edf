//! Storage backend trait and implementations.
//!
//! A backend exposes a library location as a lazily-walked tree of
//! [`Entry`]s plus reads of individual files. Everything is read-only; the
//! scanner never writes to the library.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::file::Entry;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::{Read, Seek};
use std::path::Path;
use std::pin::Pin;

pub type EntryStream<'a> = Pin<Box<dyn Stream<Item = Result<Entry>> + Send + 'a>>;

/// Synchronous, seekable reader handed to blocking tag parsers.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

pub type BoxReadSeek = Box<dyn ReadSeek + 'static>;

/// Unified interface for library locations.
///
/// # Path Handling
/// All paths are relative to the storage root and canonical (see
/// [`validate_path`](crate::validate_path)). Implementations must enforce this.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use audiohub_storage::backend::StorageBackend;
///
/// async fn count_files(backend: &dyn StorageBackend) -> usize {
///     backend
///         .walk()
///         .filter(|entry| std::future::ready(matches!(entry, Ok(e) if !e.is_dir())))
///         .count()
///         .await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Walk every visible entry beneath the root.
    ///
    /// # Notes
    /// - A directory is always yielded before anything inside it. Beyond that
    ///   the order is backend-specific (see each backend), and consumers
    ///   should still cope with children arriving first.
    /// - Hidden entries (leading `.`) are skipped and hidden directories are
    ///   not descended into.
    /// - An unreadable entry or directory yields an `Err` item and the walk
    ///   carries on with its siblings. The stream never terminates early
    ///   because of a single failure.
    fn walk(&self) -> EntryStream<'_>;

    /// Collect the whole walk into a [`Vec`], failing on the first error.
    async fn list(&self) -> Result<Vec<Entry>> {
        self.walk().try_collect().await
    }

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Open a file for synchronous, seekable reads.
    ///
    /// Returns a `'static` boxed reader suitable for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking). The async setup
    /// (opening the file) happens before returning.
    ///
    /// ```no_run
    /// use std::io::Read;
    /// use std::path::Path;
    /// # use audiohub_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut reader = backend.reader(Path::new("Dune/01.mp3")).await?;
    /// let header = tokio::task::spawn_blocking(move || {
    ///     let mut header = [0u8; 3];
    ///     reader.read_exact(&mut header).map(|_| header)
    /// }).await.unwrap();
    /// # Ok(())
    /// # }
    /// ```
    async fn reader(&self, path: &Path) -> Result<BoxReadSeek>;

    /// Get entry metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if nothing
    /// exists at the path.
    async fn stat(&self, path: &Path) -> Result<Entry>;
}
