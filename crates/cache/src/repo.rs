//! Repository for books, files and scan markers.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::last_scan::LastScan;
use crate::models::{BookRow, FileRow, from_nanos, path_text, to_nanos};
use crate::records::{Book, File, SortKey};
use crate::store::LibraryStore;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use std::path::Path;
use time::UtcDateTime;

const LAST_SCAN_MARKER: &str = "last_scan";

/// Row counts, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct Counts {
    pub books: i64,
    pub files: i64,
}

/// SQLite-backed [`LibraryStore`].
///
/// Books own their files through a foreign key: a file can only be stored
/// once its book is. In dry-run mode every write is accepted and discarded.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    // =========================================================================
    // Listing
    // =========================================================================

    pub async fn list_books(&self, sort: SortKey) -> Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/list_books.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut books = rows.into_iter().map(Book::try_from).collect::<Result<Vec<_>>>()?;
        sort.sort(&mut books);
        Ok(books)
    }

    /// Files of one book, ordered by path.
    pub async fn list_files(&self, book: &Path) -> Result<Vec<File>> {
        let rows: Vec<FileRow> = sqlx::query_as(include_str!("../queries/list_files_for_book.sql"))
            .bind(path_text(book, "book id")?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(File::try_from).collect()
    }

    pub async fn count(&self) -> Result<Counts> {
        sqlx::query_as(include_str!("../queries/count.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }
}

#[async_trait]
impl LibraryStore for Repository {
    // =========================================================================
    // Books
    // =========================================================================

    async fn get_book(&self, id: &Path) -> Result<Option<Book>> {
        let row: Option<BookRow> = sqlx::query_as(include_str!("../queries/get_book.sql"))
            .bind(path_text(id, "book id")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Book::try_from).transpose()
    }

    async fn put_book(&self, book: &Book) -> Result<()> {
        let row = BookRow::try_from(book)?;
        if self.dry_run {
            return Ok(());
        }
        sqlx::query(include_str!("../queries/upsert_book.sql"))
            .bind(row.id)
            .bind(row.title)
            .bind(row.author)
            .bind(row.artist)
            .bind(row.album)
            .bind(row.artwork)
            .bind(row.added_at)
            .bind(row.modified_at)
            .bind(row.last_scanned_at)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Files
    // =========================================================================

    async fn get_file(&self, id: &Path) -> Result<Option<File>> {
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/get_file.sql"))
            .bind(path_text(id, "file id")?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(File::try_from).transpose()
    }

    async fn put_file(&self, file: &File) -> Result<()> {
        let row = FileRow::try_from(file)?;
        if self.dry_run {
            return Ok(());
        }
        sqlx::query(include_str!("../queries/upsert_file.sql"))
            .bind(row.id)
            .bind(row.book_id)
            .bind(row.name)
            .bind(row.extension)
            .bind(row.size)
            .bind(row.added_at)
            .bind(row.modified_at)
            .bind(row.title)
            .bind(row.artist)
            .bind(row.author)
            .bind(row.album)
            .bind(row.artwork)
            .bind(row.data)
            .bind(row.duration)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    // =========================================================================
    // Durability and markers
    // =========================================================================

    async fn flush(&self) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        // PASSIVE never waits on readers; frames it can't copy yet stay
        // durable in the WAL itself.
        sqlx::query("PRAGMA wal_checkpoint(PASSIVE)")
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn last_scan(&self) -> Result<LastScan> {
        let at: Option<i64> = sqlx::query_scalar(include_str!("../queries/get_marker.sql"))
            .bind(LAST_SCAN_MARKER)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(at.map(|nanos| from_nanos(nanos, "last scan")).transpose()?.into())
    }

    async fn set_last_scan(&self, at: UtcDateTime) -> Result<()> {
        let nanos = to_nanos(at, "last scan")?;
        if self.dry_run {
            return Ok(());
        }
        sqlx::query(include_str!("../queries/set_marker.sql"))
            .bind(LAST_SCAN_MARKER)
            .bind(nanos)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn at(seconds: i64) -> UtcDateTime {
        UtcDateTime::from_unix_timestamp(seconds).unwrap()
    }

    async fn repository() -> Repository {
        Database::connect_in_memory().await.unwrap().repository()
    }

    fn dune() -> Book {
        let mut book = Book::new("Dune", at(1_000));
        book.title = Some("Dune".to_string());
        book.modified = at(2_000);
        book
    }

    fn chapter(book: &str, name: &str) -> File {
        let mut file = File::new(format!("{book}/{name}"), book, 1_024, at(2_000), at(1_000));
        file.title = Some(name.to_string());
        file.duration = 12.5;
        file
    }

    #[tokio::test]
    async fn test_book_round_trip() {
        let repo = repository().await;
        assert_eq!(repo.get_book(Path::new("Dune")).await.unwrap(), None);
        let mut book = dune();
        book.artwork = Some(vec![1, 2, 3]);
        book.last_scanned = Some(at(3_000));
        repo.put_book(&book).await.unwrap();
        assert_eq!(repo.get_book(Path::new("Dune")).await.unwrap(), Some(book));
    }

    #[tokio::test]
    async fn test_put_book_replaces_but_keeps_added() {
        let repo = repository().await;
        repo.put_book(&dune()).await.unwrap();
        let mut changed = dune();
        changed.added = at(9_999);
        changed.title = None;
        changed.modified = at(5_000);
        repo.put_book(&changed).await.unwrap();
        let stored = repo.get_book(Path::new("Dune")).await.unwrap().unwrap();
        assert_eq!(stored.added, at(1_000));
        assert_eq!(stored.title, None);
        assert_eq!(stored.modified, at(5_000));
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let repo = repository().await;
        repo.put_book(&dune()).await.unwrap();
        let file = chapter("Dune", "01.mp3");
        repo.put_file(&file).await.unwrap();
        repo.flush().await.unwrap();
        assert_eq!(repo.get_file(Path::new("Dune/01.mp3")).await.unwrap(), Some(file));
    }

    #[tokio::test]
    async fn test_file_requires_book() {
        let repo = repository().await;
        let err = repo.put_file(&chapter("Dune", "01.mp3")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
        assert_eq!(repo.get_file(Path::new("Dune/01.mp3")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_files_for_book() {
        let repo = repository().await;
        repo.put_book(&dune()).await.unwrap();
        repo.put_book(&Book::new("Emma", at(1_000))).await.unwrap();
        repo.put_file(&chapter("Dune", "02.mp3")).await.unwrap();
        repo.put_file(&chapter("Dune", "01.mp3")).await.unwrap();
        repo.put_file(&chapter("Emma", "01.mp3")).await.unwrap();
        let files = repo.list_files(Path::new("Dune")).await.unwrap();
        let ids: Vec<_> = files.into_iter().map(|f| f.id).collect();
        assert_eq!(ids, [PathBuf::from("Dune/01.mp3"), PathBuf::from("Dune/02.mp3")]);
        assert_eq!(repo.count().await.unwrap(), Counts { books: 2, files: 3 });
    }

    #[tokio::test]
    async fn test_list_books_sorted() {
        let repo = repository().await;
        repo.put_book(&Book::new("Anathem", at(1))).await.unwrap();
        repo.put_book(&Book::new("Zorro", at(2))).await.unwrap();
        let added: Vec<_> = repo.list_books(SortKey::Added).await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(added, [PathBuf::from("Zorro"), PathBuf::from("Anathem")]);
        let title: Vec<_> = repo.list_books(SortKey::Title).await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(title, [PathBuf::from("Anathem"), PathBuf::from("Zorro")]);
    }

    #[tokio::test]
    async fn test_last_scan_marker() {
        let repo = repository().await;
        assert_eq!(repo.last_scan().await.unwrap(), LastScan::Never);
        repo.set_last_scan(at(100)).await.unwrap();
        repo.set_last_scan(at(200)).await.unwrap();
        assert_eq!(repo.last_scan().await.unwrap(), LastScan::At(at(200)));
    }

    #[tokio::test]
    async fn test_dry_run_discards_writes() {
        let repo = repository().await.dry_run(true);
        repo.put_book(&dune()).await.unwrap();
        repo.put_file(&chapter("Dune", "01.mp3")).await.unwrap();
        repo.set_last_scan(at(100)).await.unwrap();
        repo.flush().await.unwrap();
        assert_eq!(repo.get_book(Path::new("Dune")).await.unwrap(), None);
        assert_eq!(repo.last_scan().await.unwrap(), LastScan::Never);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("library.sqlite");
        let db = Database::connect(&path).await.unwrap();
        db.repository().put_book(&dune()).await.unwrap();
        db.repository().flush().await.unwrap();
        db.close().await;
        let db = Database::connect(&path).await.unwrap();
        assert!(db.repository().get_book(Path::new("Dune")).await.unwrap().is_some());
        db.close().await;
    }
}
