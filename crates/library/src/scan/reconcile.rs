//! Merging what a scan observed into what the library store already knows.
//!
//! The rules only ever fill in missing values or move timestamps forward, so
//! the outcome doesn't depend on the order files are reconciled in, and
//! reconciling the same observation twice changes nothing the second time.

use crate::scan::classify::FileJob;
use crate::scan::error::{ErrorKind, Result};
use crate::scan::extract::Payload;
use audiohub_cache::{Book, File, StoreHandle};
use exn::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Lifecycle of a book within one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    /// Not discovered by this scan (yet).
    Unseen,
    /// Discovered, but nothing has been written for it. Books without any
    /// supported files never leave this state and are never stored.
    PendingInsert,
    /// Reconciled against the store at least once during this scan, whether
    /// or not that changed the stored record.
    Inserted,
}

struct Tracked {
    state: BookState,
    /// The book as observed so far during this scan.
    book: Book,
    /// Whether `book` has changed since it was last written.
    dirty: bool,
    /// Whether this scan actually changed the stored book.
    written: bool,
}

/// Writes files, and the books that own them, to the library store.
///
/// Owned by a single consumer: reconciliation is sequential even though
/// extraction isn't.
pub struct Reconciler {
    store: StoreHandle,
    now: UtcDateTime,
    books: HashMap<PathBuf, Tracked>,
}

impl Reconciler {
    /// `now` is the scan's timestamp, used for `added` and `last_scanned`.
    pub fn new(store: StoreHandle, now: UtcDateTime) -> Self {
        Self {
            store,
            now,
            books: HashMap::new(),
        }
    }

    /// Start tracking a newly discovered book. Re-registering is a no-op.
    pub fn register(&mut self, book: Book) {
        self.books.entry(book.id.clone()).or_insert(Tracked {
            state: BookState::PendingInsert,
            book,
            dirty: true,
            written: false,
        });
    }

    pub fn state(&self, id: &Path) -> BookState {
        self.books.get(id).map_or(BookState::Unseen, |tracked| tracked.state)
    }

    /// Number of books reconciled during this scan.
    pub fn inserted(&self) -> usize {
        self.books.values().filter(|tracked| tracked.state == BookState::Inserted).count()
    }

    /// Number of books this scan created or changed in the store.
    pub fn written(&self) -> usize {
        self.books.values().filter(|tracked| tracked.written).count()
    }

    /// Fold one extraction result into its book and write both.
    ///
    /// `payload` is `None` when extraction failed; the file is then stored
    /// with its filesystem fields only. The book is always written before the
    /// file. Returns whether anything in the store changed.
    pub async fn reconcile(&mut self, job: &FileJob, payload: Option<Payload>) -> Result<bool> {
        let file = observed_file(job, payload, self.now);
        let tracked = self.books.get_mut(&job.book).ok_or_raise(|| ErrorKind::Classification(job.entry.path.clone()))?;
        tracked.dirty |= absorb(&mut tracked.book, &file);

        let mut changed = false;
        if tracked.state != BookState::Inserted || tracked.dirty {
            let book = tracked.book.clone();
            let wrote = self.upsert_book(&book).await?;
            changed |= wrote;
            if let Some(tracked) = self.books.get_mut(&job.book) {
                tracked.state = BookState::Inserted;
                tracked.dirty = false;
                tracked.written |= wrote;
            }
        }
        changed |= self.upsert_file(&file).await?;
        Ok(changed)
    }

    /// Insert the book, or merge it into the stored one. Returns whether a
    /// write happened.
    pub async fn upsert_book(&self, book: &Book) -> Result<bool> {
        let existing = self.store.get_book(&book.id).await.or_raise(|| ErrorKind::Cache)?;
        let mut merged = match existing {
            None => book.clone(),
            Some(existing) => match merge_book(&existing, book) {
                Some(merged) => merged,
                None => return Ok(false),
            },
        };
        merged.last_scanned = Some(self.now);
        self.store.put_book(&merged).await.or_raise(|| ErrorKind::Cache)?;
        self.store.flush().await.or_raise(|| ErrorKind::Cache)?;
        Ok(true)
    }

    /// Insert the file, or merge it into the stored one. Returns whether a
    /// write happened.
    pub async fn upsert_file(&self, file: &File) -> Result<bool> {
        let existing = self.store.get_file(&file.id).await.or_raise(|| ErrorKind::Cache)?;
        let merged = match existing {
            None => file.clone(),
            Some(existing) => match merge_file(&existing, file) {
                Some(merged) => merged,
                None => return Ok(false),
            },
        };
        self.store.put_file(&merged).await.or_raise(|| ErrorKind::Cache)?;
        self.store.flush().await.or_raise(|| ErrorKind::Cache)?;
        Ok(true)
    }
}

/// The file as the filesystem and extraction describe it right now.
pub fn observed_file(job: &FileJob, payload: Option<Payload>, now: UtcDateTime) -> File {
    let entry = &job.entry;
    let mut file = File::new(entry.path.clone(), job.book.clone(), entry.size, entry.modified, now);
    match payload {
        Some(Payload::Media(metadata)) => {
            file.title = metadata.title;
            file.artist = metadata.artist;
            file.author = metadata.author;
            file.album = metadata.album;
            file.artwork = metadata.artwork;
            file.duration = metadata.duration;
        },
        Some(Payload::Image(bytes)) => file.data = Some(bytes),
        None => {},
    }
    file
}

fn fill<T: Clone>(target: &mut Option<T>, source: Option<&T>) {
    if target.is_none() {
        *target = source.cloned();
    }
}

/// Fold a file into its book's running aggregate. Returns whether the book
/// changed.
fn absorb(book: &mut Book, file: &File) -> bool {
    // Only absent fields get filled, so presence plus mtime says it all.
    let shape = |book: &Book| {
        (
            book.modified,
            book.title.is_some(),
            book.author.is_some(),
            book.artist.is_some(),
            book.album.is_some(),
            book.artwork.is_some(),
        )
    };
    let before = shape(book);
    book.modified = book.modified.max(file.modified);
    fill(&mut book.title, file.title.as_ref());
    fill(&mut book.author, file.author.as_ref());
    fill(&mut book.artist, file.artist.as_ref());
    fill(&mut book.album, file.album.as_ref());
    if book.artwork.is_none() {
        book.artwork = file.cover().map(<[u8]>::to_vec);
    }
    shape(book) != before
}

/// `existing` with `incoming` merged in, or `None` if nothing would change.
///
/// Modification time only moves forward; descriptive fields are only filled
/// where the stored book has none; `added` and `last_scanned` stay as stored.
pub fn merge_book(existing: &Book, incoming: &Book) -> Option<Book> {
    let mut merged = existing.clone();
    merged.modified = existing.modified.max(incoming.modified);
    fill(&mut merged.title, incoming.title.as_ref());
    fill(&mut merged.author, incoming.author.as_ref());
    fill(&mut merged.artist, incoming.artist.as_ref());
    fill(&mut merged.album, incoming.album.as_ref());
    fill(&mut merged.artwork, incoming.artwork.as_ref());
    (merged != *existing).then_some(merged)
}

/// `existing` with `incoming` merged in, or `None` if nothing would change.
///
/// Filesystem fields always take the incoming values; metadata is only
/// filled where the stored file has none, so a failed extraction never
/// erases what an earlier one found. `added` stays as stored.
pub fn merge_file(existing: &File, incoming: &File) -> Option<File> {
    let mut merged = existing.clone();
    merged.name.clone_from(&incoming.name);
    merged.extension.clone_from(&incoming.extension);
    merged.size = incoming.size;
    merged.modified = incoming.modified;
    fill(&mut merged.title, incoming.title.as_ref());
    fill(&mut merged.artist, incoming.artist.as_ref());
    fill(&mut merged.author, incoming.author.as_ref());
    fill(&mut merged.album, incoming.album.as_ref());
    fill(&mut merged.artwork, incoming.artwork.as_ref());
    fill(&mut merged.data, incoming.data.as_ref());
    if merged.duration <= 0.0 {
        merged.duration = incoming.duration;
    }
    (merged != *existing).then_some(merged)
}
