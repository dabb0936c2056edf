//! In-memory storage backend for testing.

use super::{BoxReadSeek, EntryStream};
use crate::error::{ErrorKind, Result};
use crate::file::Entry;
use crate::path::{is_hidden, validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::sync::RwLock;

use crate::StorageBackend;

/// In-memory storage backend for testing.
///
/// Files live in a map behind a [`RwLock`]; directories are implied by the
/// paths of the files beneath them. Walks come out sorted in pre-order,
/// unless [`reversed()`](Self::reversed) asks for the opposite so consumers
/// can be tested against children that arrive before their parents.
///
/// # Examples
///
/// ```
/// use audiohub_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("Dune/01.mp3", b"ID3..."),
/// ]);
/// // One directory, one file.
/// assert_eq!(backend.list().await?.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, (UtcDateTime, Vec<u8>)>>,
    unlistable: HashSet<PathBuf>,
    unreadable: HashSet<PathBuf>,
    reversed: bool,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files, all stamped with the
    /// same modification time.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        let mut map = BTreeMap::new();
        for (path, data) in files {
            map.insert(Self::validated(path.into()), (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            unlistable: HashSet::new(),
            unreadable: HashSet::new(),
            reversed: false,
        }
    }

    /// Add a single file with an explicit modification time.
    pub fn with_file(mut self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>, modified: UtcDateTime) -> Self {
        self.storage.get_mut().insert(Self::validated(path.into()), (modified, data.into()));
        self
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Listing this directory fails: the walk yields an error in place of
    /// everything beneath it.
    pub fn with_unlistable(mut self, directory: impl Into<PathBuf>) -> Self {
        self.unlistable.insert(Self::validated(directory.into()));
        self
    }

    /// The file is listed but reading it fails with a permission error.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        self.unreadable.insert(Self::validated(path.into()));
        self
    }

    /// Walk in reverse pre-order (children before their parents).
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    /// Create or replace a file after construction.
    pub async fn put(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>, modified: UtcDateTime) {
        self.storage.write().await.insert(Self::validated(path.into()), (modified, data.into()));
    }

    fn validated(path: PathBuf) -> PathBuf {
        let Ok(validated) = validate_path(&path) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend: invalid path {}", path.display());
        };
        validated
    }

    fn is_visible(path: &Path) -> bool {
        path.ancestors().all(|ancestor| !is_hidden(ancestor))
    }

    fn check_readable(&self, path: &Path) -> Result<PathBuf> {
        let path = validate_path(path)?;
        if self.unreadable.contains(&path) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        Ok(path)
    }

    /// Snapshot the tree as walk items, in walk order.
    async fn snapshot(&self) -> Vec<Result<Entry>> {
        let guard = self.storage.read().await;
        let mut directories: BTreeMap<PathBuf, UtcDateTime> = BTreeMap::new();
        for (path, (modified, _)) in guard.iter() {
            for ancestor in path.ancestors().skip(1).filter(|a| !a.as_os_str().is_empty()) {
                let stamp = directories.entry(ancestor.to_path_buf()).or_insert(*modified);
                *stamp = (*stamp).max(*modified);
            }
        }

        let mut entries: BTreeMap<PathBuf, Entry> = directories
            .into_iter()
            .map(|(path, modified)| (path.clone(), Entry::directory(path, modified)))
            .collect();
        for (path, (modified, data)) in guard.iter() {
            entries.insert(path.clone(), Entry::file(path.clone(), data.len() as u64, *modified));
        }

        let mut failed: BTreeSet<&PathBuf> = BTreeSet::new();
        let mut items = Vec::new();
        for (path, entry) in &entries {
            if !Self::is_visible(path) || failed.iter().any(|dir| path.starts_with(dir)) {
                continue;
            }
            items.push(Ok(entry.clone()));
            if entry.is_dir() && self.unlistable.contains(path) {
                failed.insert(path);
                items.push(Err(exn::Exn::from(ErrorKind::PermissionDenied(path.clone()))));
            }
        }
        if self.reversed {
            items.reverse();
        }
        items
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn walk(&self) -> EntryStream<'_> {
        Box::pin(stream! {
            // Snapshot first so the lock isn't held across yield points.
            for item in self.snapshot().await {
                yield item;
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = self.check_readable(path)?;
        let (_modified, data) =
            self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }

    async fn reader(&self, path: &Path) -> Result<BoxReadSeek> {
        let data = self.read(path).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn stat(&self, path: &Path) -> Result<Entry> {
        let path = validate_path(path)?;
        self.snapshot()
            .await
            .into_iter()
            .filter_map(|item| item.ok())
            .find(|entry| entry.path == path)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn paths(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.to_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_walk_is_pre_order() {
        let backend = MockBackend::with_files([
            ("Dune/01.mp3", Vec::from(*b"a")),
            ("Dune/cover.jpg", Vec::from(*b"b")),
            ("Series/Book 1/part.m4b", Vec::from(*b"c")),
        ]);
        let entries = backend.list().await.unwrap();
        assert_eq!(
            paths(&entries),
            ["Dune", "Dune/01.mp3", "Dune/cover.jpg", "Series", "Series/Book 1", "Series/Book 1/part.m4b"]
        );
        assert!(entries[0].is_dir());
        assert!(!entries[1].is_dir());
    }

    #[tokio::test]
    async fn test_walk_reversed() {
        let backend = MockBackend::with_files([("Dune/01.mp3", Vec::from(*b"a"))]).reversed();
        let entries = backend.list().await.unwrap();
        assert_eq!(paths(&entries), ["Dune/01.mp3", "Dune"]);
    }

    #[tokio::test]
    async fn test_walk_skips_hidden() {
        let backend = MockBackend::with_files([
            (".trash/Old/01.mp3", Vec::from(*b"a")),
            ("Dune/.DS_Store", Vec::from(*b"b")),
            ("Dune/01.mp3", Vec::from(*b"c")),
        ]);
        let entries = backend.list().await.unwrap();
        assert_eq!(paths(&entries), ["Dune", "Dune/01.mp3"]);
    }

    #[tokio::test]
    async fn test_unlistable_directory_yields_error_and_continues() {
        let backend = MockBackend::with_files([
            ("Broken/01.mp3", Vec::from(*b"a")),
            ("Dune/01.mp3", Vec::from(*b"b")),
        ])
        .with_unlistable("Broken");
        let items: Vec<_> = backend.walk().collect().await;
        assert_eq!(items.len(), 4);
        assert!(matches!(&items[0], Ok(e) if e.path == Path::new("Broken")));
        assert!(matches!(&items[1], Err(e) if matches!(&**e, ErrorKind::PermissionDenied(_))));
        assert!(matches!(&items[3], Ok(e) if e.path == Path::new("Dune/01.mp3")));
    }

    #[tokio::test]
    async fn test_directory_modified_is_latest_child() {
        let early = UtcDateTime::from_unix_timestamp(1_000).unwrap();
        let late = UtcDateTime::from_unix_timestamp(2_000).unwrap();
        let backend = MockBackend::default()
            .with_file("Dune/01.mp3", *b"a", early)
            .with_file("Dune/02.mp3", *b"b", late);
        let entries = backend.list().await.unwrap();
        assert_eq!(entries[0].modified, late);
        assert_eq!(entries[1].modified, early);
    }

    #[tokio::test]
    async fn test_read_and_reader() {
        let backend = MockBackend::with_files([("Dune/cover.jpg", Vec::from(*b"jpeg"))]);
        assert_eq!(backend.read(Path::new("Dune/cover.jpg")).await.unwrap(), b"jpeg");
        let mut reader = backend.reader(Path::new("Dune/cover.jpg")).await.unwrap();
        let mut buffer = Vec::new();
        std::io::Read::read_to_end(&mut reader, &mut buffer).unwrap();
        assert_eq!(buffer, b"jpeg");
    }

    #[tokio::test]
    async fn test_read_errors() {
        let backend = MockBackend::with_files([("Dune/01.mp3", Vec::from(*b"a"))]).with_unreadable("Dune/01.mp3");
        let err = backend.read(Path::new("Dune/01.mp3")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        let err = backend.read(Path::new("missing.mp3")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
    }

    #[tokio::test]
    async fn test_put_replaces_file() {
        let backend = MockBackend::with_files([("Dune/01.mp3", Vec::from(*b"a"))]);
        let later = UtcDateTime::from_unix_timestamp(3_000).unwrap();
        backend.put("Dune/01.mp3", *b"longer", later).await;
        let entries = backend.list().await.unwrap();
        assert_eq!(entries[1].size, 6);
        assert_eq!(entries[1].modified, later);
    }

    #[tokio::test]
    async fn test_stat() {
        let backend = MockBackend::with_files([("Dune/01.mp3", Vec::from(*b"12345"))]);
        assert_eq!(backend.stat(Path::new("Dune/01.mp3")).await.unwrap().size, 5);
        assert!(backend.stat(Path::new("Dune")).await.unwrap().is_dir());
        let err = backend.stat(Path::new("Dune/02.mp3")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
