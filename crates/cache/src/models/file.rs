use super::{from_nanos, path_text, to_nanos};
use crate::error::{Error, ErrorKind};
use crate::records::File;
use exn::ResultExt;
use std::path::PathBuf;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FileRow {
    pub(crate) id: String,
    pub(crate) book_id: String,
    pub(crate) name: String,
    pub(crate) extension: String,
    pub(crate) size: i64,
    pub(crate) added_at: i64,
    pub(crate) modified_at: i64,
    pub(crate) title: Option<String>,
    pub(crate) artist: Option<String>,
    pub(crate) author: Option<String>,
    pub(crate) album: Option<String>,
    pub(crate) artwork: Option<Vec<u8>>,
    pub(crate) data: Option<Vec<u8>>,
    pub(crate) duration: f64,
}
impl TryFrom<&File> for FileRow {
    type Error = Error;
    fn try_from(file: &File) -> Result<Self, Self::Error> {
        Ok(Self {
            id: path_text(&file.id, "file id")?,
            book_id: path_text(&file.book, "file book")?,
            name: file.name.clone(),
            extension: file.extension.clone(),
            size: i64::try_from(file.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            added_at: to_nanos(file.added, "file added")?,
            modified_at: to_nanos(file.modified, "file modified")?,
            title: file.title.clone(),
            artist: file.artist.clone(),
            author: file.author.clone(),
            album: file.album.clone(),
            artwork: file.artwork.clone(),
            data: file.data.clone(),
            duration: file.duration,
        })
    }
}
impl TryFrom<FileRow> for File {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PathBuf::from(row.id),
            book: PathBuf::from(row.book_id),
            name: row.name,
            extension: row.extension,
            size: u64::try_from(row.size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            added: from_nanos(row.added_at, "file added")?,
            modified: from_nanos(row.modified_at, "file modified")?,
            title: row.title,
            artist: row.artist,
            author: row.author,
            album: row.album,
            artwork: row.artwork,
            data: row.data,
            duration: row.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::UtcDateTime;

    #[test]
    fn test_negative_size_is_invalid() {
        let row = FileRow {
            id: "Dune/01.mp3".to_string(),
            book_id: "Dune".to_string(),
            name: "01".to_string(),
            extension: "mp3".to_string(),
            size: -1,
            added_at: 0,
            modified_at: 0,
            title: None,
            artist: None,
            author: None,
            album: None,
            artwork: None,
            data: None,
            duration: 0.0,
        };
        let err = File::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("file size")));
    }

    #[test]
    fn test_model_to_row() {
        let modified = UtcDateTime::from_unix_timestamp_nanos(1_700_000_000_000_000_001).unwrap();
        let mut file = File::new("Dune/01.mp3", "Dune", 4_096, modified, UtcDateTime::UNIX_EPOCH);
        file.duration = 61.5;
        let row = FileRow::try_from(&file).unwrap();
        assert_eq!(row.book_id, "Dune");
        assert_eq!(row.size, 4_096);
        assert_eq!(row.modified_at, 1_700_000_000_000_000_001);
        assert_eq!(row.duration, 61.5);
    }
}
