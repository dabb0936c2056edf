use super::{from_nanos, path_text, to_nanos};
use crate::error::Error;
use crate::records::Book;
use std::path::PathBuf;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) id: String,
    pub(crate) title: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) artist: Option<String>,
    pub(crate) album: Option<String>,
    pub(crate) artwork: Option<Vec<u8>>,
    pub(crate) added_at: i64,
    pub(crate) modified_at: i64,
    pub(crate) last_scanned_at: Option<i64>,
}
impl TryFrom<&Book> for BookRow {
    type Error = Error;
    fn try_from(book: &Book) -> Result<Self, Self::Error> {
        Ok(Self {
            id: path_text(&book.id, "book id")?,
            title: book.title.clone(),
            author: book.author.clone(),
            artist: book.artist.clone(),
            album: book.album.clone(),
            artwork: book.artwork.clone(),
            added_at: to_nanos(book.added, "book added")?,
            modified_at: to_nanos(book.modified, "book modified")?,
            last_scanned_at: book.last_scanned.map(|at| to_nanos(at, "book last scanned")).transpose()?,
        })
    }
}
impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PathBuf::from(row.id),
            title: row.title,
            author: row.author,
            artist: row.artist,
            album: row.album,
            artwork: row.artwork,
            added: from_nanos(row.added_at, "book added")?,
            modified: from_nanos(row.modified_at, "book modified")?,
            last_scanned: row.last_scanned_at.map(|at| from_nanos(at, "book last scanned")).transpose()?,
        })
    }
}
