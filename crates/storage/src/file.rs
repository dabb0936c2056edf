//! Entries yielded by storage backends while walking a library location.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use time::UtcDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

/// A single directory or regular file found beneath the library root.
///
/// The path is always relative to the root and canonical (see
/// [`validate_path`](crate::validate_path)), so it doubles as the stable
/// identity of whatever record is later derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Relative path from storage root
    pub path: PathBuf,
    /// Size in bytes (zero for directories)
    pub size: u64,
    /// Last modified timestamp reported by the host
    pub modified: UtcDateTime,
}
impl Entry {
    pub fn directory(path: impl Into<PathBuf>, modified: UtcDateTime) -> Self {
        Self {
            kind: EntryKind::Directory,
            path: path.into(),
            size: 0,
            modified,
        }
    }

    pub fn file(path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        Self {
            kind: EntryKind::File,
            path: path.into(),
            size,
            modified,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// File name without its extension.
    pub fn name(&self) -> String {
        self.path.file_stem().map(OsStr::to_string_lossy).unwrap_or_default().into_owned()
    }

    /// Lowercased extension, or an empty string when there isn't one.
    pub fn extension(&self) -> String {
        self.path.extension().map(|ext| ext.to_string_lossy().to_lowercase()).unwrap_or_default()
    }

    /// Parent path, relative to the root. Entries directly beneath the root
    /// have an empty parent.
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Number of path components; direct children of the root are depth 1.
    pub fn depth(&self) -> usize {
        self.path.components().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Dune/01 - Prologue.MP3", "01 - Prologue", "mp3", "Dune", 2)]
    #[case("Dune/cover.jpeg", "cover", "jpeg", "Dune", 2)]
    #[case("Series/Book 1/part.m4b", "part", "m4b", "Series/Book 1", 3)]
    #[case("README", "README", "", "", 1)]
    fn test_path_helpers(
        #[case] path: &str,
        #[case] name: &str,
        #[case] extension: &str,
        #[case] parent: &str,
        #[case] depth: usize,
    ) {
        let entry = Entry::file(path, 10, UtcDateTime::UNIX_EPOCH);
        assert_eq!(entry.name(), name);
        assert_eq!(entry.extension(), extension);
        assert_eq!(entry.parent(), Path::new(parent));
        assert_eq!(entry.depth(), depth);
    }

    #[test]
    fn test_directory_has_no_size() {
        let entry = Entry::directory("Dune", UtcDateTime::UNIX_EPOCH);
        assert!(entry.is_dir());
        assert_eq!(entry.size, 0);
    }
}
