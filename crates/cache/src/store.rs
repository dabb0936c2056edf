use crate::error::Result;
use crate::last_scan::LastScan;
use crate::records::{Book, File};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use time::UtcDateTime;

pub type StoreHandle = Arc<dyn LibraryStore>;

/// Key-indexed persistence for books and files.
///
/// `put_*` replaces whatever is stored under the record's id with exactly
/// what it's given (except `added`, which keeps its first value); merging is
/// the caller's job. Each put is a single atomic statement. Nothing is ever
/// deleted through this interface.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn get_book(&self, id: &Path) -> Result<Option<Book>>;

    async fn put_book(&self, book: &Book) -> Result<()>;

    async fn get_file(&self, id: &Path) -> Result<Option<File>>;

    /// Fails if the owning book hasn't been stored yet.
    async fn put_file(&self, file: &File) -> Result<()>;

    /// Make every completed put durable.
    async fn flush(&self) -> Result<()>;

    async fn last_scan(&self) -> Result<LastScan>;

    async fn set_last_scan(&self, at: UtcDateTime) -> Result<()>;
}
