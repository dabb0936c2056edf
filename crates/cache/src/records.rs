//! Library records as the rest of audiohub sees them.
//!
//! Both records are keyed by their canonical path relative to the library
//! root; scanning the same path twice always lands on the same record.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// A folder of audio files (and maybe cover art) under the library root.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: PathBuf,
    pub title: Option<String>,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<Vec<u8>>,
    /// First time the book was seen. Never changes once stored.
    pub added: UtcDateTime,
    /// Latest modification time of any of its files.
    pub modified: UtcDateTime,
    /// Last scan that changed this record.
    pub last_scanned: Option<UtcDateTime>,
}
impl Book {
    /// A book nothing is known about yet. Its modification time starts at the
    /// epoch so that the first file observed always moves it forward.
    pub fn new(id: impl Into<PathBuf>, added: UtcDateTime) -> Self {
        Self {
            id: id.into(),
            title: None,
            author: None,
            artist: None,
            album: None,
            artwork: None,
            added,
            modified: UtcDateTime::UNIX_EPOCH,
            last_scanned: None,
        }
    }

    /// Folder name, for display when there's no title.
    pub fn folder_name(&self) -> String {
        self.id.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// Title if tagged, otherwise the folder name.
    pub fn display_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.folder_name())
    }
}

/// A single audio or image file belonging to a [`Book`].
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: PathBuf,
    /// Owning book's id.
    pub book: PathBuf,
    /// File name without extension.
    pub name: String,
    /// Lowercased extension without the leading dot.
    pub extension: String,
    pub size: u64,
    pub added: UtcDateTime,
    pub modified: UtcDateTime,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub author: Option<String>,
    pub album: Option<String>,
    /// Picture embedded in an audio file's tags.
    pub artwork: Option<Vec<u8>>,
    /// Raw contents of an image file.
    pub data: Option<Vec<u8>>,
    /// Seconds, `0.0` when unknown.
    pub duration: f64,
}
impl File {
    /// A file with filesystem-derived fields only.
    pub fn new(
        id: impl Into<PathBuf>,
        book: impl Into<PathBuf>,
        size: u64,
        modified: UtcDateTime,
        added: UtcDateTime,
    ) -> Self {
        let id = id.into();
        let name = id.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let extension = id.extension().map(|s| s.to_string_lossy().to_lowercase()).unwrap_or_default();
        Self {
            id,
            book: book.into(),
            name,
            extension,
            size,
            added,
            modified,
            title: None,
            artist: None,
            author: None,
            album: None,
            artwork: None,
            data: None,
            duration: 0.0,
        }
    }

    /// Picture this file can contribute to its book: embedded artwork for
    /// audio, the file itself for images.
    pub fn cover(&self) -> Option<&[u8]> {
        self.artwork.as_deref().or(self.data.as_deref())
    }

    pub fn book_id(&self) -> &Path {
        &self.book
    }
}

/// Orderings offered when listing books.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Most recently added first.
    #[default]
    Added,
    /// Most recently modified first.
    Modified,
    /// Title (or folder name), A to Z.
    Title,
    /// Artist A to Z; books without one go last.
    Artist,
}
impl SortKey {
    pub fn sort(self, books: &mut [Book]) {
        match self {
            Self::Added => books.sort_by(|a, b| b.added.cmp(&a.added).then_with(|| a.id.cmp(&b.id))),
            Self::Modified => books.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.id.cmp(&b.id))),
            Self::Title => books.sort_by(|a, b| {
                compare_text(Some(&a.display_title()), Some(&b.display_title())).then_with(|| a.id.cmp(&b.id))
            }),
            Self::Artist => books
                .sort_by(|a, b| compare_text(a.artist.as_deref(), b.artist.as_deref()).then_with(|| a.id.cmp(&b.id))),
        }
    }
}

/// Case-insensitive, with missing values after everything else.
fn compare_text(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
