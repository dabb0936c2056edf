//! Local filesystem storage backend.
//!
//! Library locations on the local filesystem (or anything mounted into it),
//! accessed via `tokio::fs` for async I/O.

use crate::backend::{BoxReadSeek, EntryStream};
use crate::error::ErrorKind;
use crate::file::Entry;
use crate::path::{is_hidden, validate as validate_path};
use crate::{StorageBackend, error::Result};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::Metadata;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(Entry),
    Descend(Entry, PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory. The root is not
/// created if it's missing: whether the location is reachable is for the
/// resource lease to decide, not the backend.
///
/// # Examples
///
/// ```no_run
/// use audiohub_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/srv/audiobooks")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct LocalBackend {
    name: String,
    /// Root directory for the library
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but isn't a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() && !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the absolute path for a relative storage path.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a canonical relative storage path.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_path(relative)
    }

    fn modified(metadata: &Metadata, path: &Path) -> Result<UtcDateTime> {
        let modified = metadata.modified().map_err(|e| ErrorKind::from_io(e, path))?;
        Ok(UtcDateTime::from(modified))
    }

    /// Keeps the stream loop free of error plumbing: everything that can go
    /// wrong with a single entry is funnelled into one `Result`.
    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        if is_hidden(&path) {
            return Ok(WalkEntry::Skip);
        }
        let relative = self.relative_path(&path)?;
        let file_type = entry.file_type().await.map_err(|e| ErrorKind::from_io(e, &relative))?;
        let metadata = if file_type.is_symlink() {
            // Symlinked files are followed; symlinked directories are not, so
            // a link pointing back up the tree can't make the walk endless.
            let target = fs::metadata(&path).await.map_err(|e| ErrorKind::from_io(e, &relative))?;
            if target.is_dir() {
                tracing::debug!(path = %relative.display(), "Not following symlinked directory");
                return Ok(WalkEntry::Skip);
            }
            target
        } else {
            entry.metadata().await.map_err(|e| ErrorKind::from_io(e, &relative))?
        };
        let modified = Self::modified(&metadata, &relative)?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(Entry::directory(relative, modified), path));
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(Entry::file(relative, metadata.len(), modified)));
        }
        // Sockets, FIFOs and friends.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    /// Directory by directory off a stack: every entry of a directory is
    /// yielded (in `read_dir` order) before any of its subdirectories is
    /// listed, and the most recently found subdirectory is listed next. So
    /// parents precede children, but siblings' subtrees aren't contiguous.
    fn walk(&self) -> EntryStream<'_> {
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // Removed between being listed and being read.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(ErrorKind::from_io(err, &current)));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => {
                            yield Err(exn::Exn::from(ErrorKind::from_io(e, &current)));
                            // A failing iterator won't recover; move on to the next directory.
                            continue 'dirs;
                        },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(file)) => yield Ok(file),
                        Ok(WalkEntry::Descend(directory, absolute)) => {
                            stack.push(absolute);
                            yield Ok(directory);
                        },
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| ErrorKind::from_io(e, path))?)
    }

    async fn reader(&self, path: &Path) -> Result<BoxReadSeek> {
        let abs_path = self.absolute_path(path)?;
        let file = fs::File::open(&abs_path).await.map_err(|e| ErrorKind::from_io(e, path))?;
        Ok(Box::new(BufReader::new(file.into_std().await)))
    }

    async fn stat(&self, path: &Path) -> Result<Entry> {
        let relative = validate_path(path)?;
        let metadata = fs::metadata(self.root.join(&relative)).await.map_err(|e| ErrorKind::from_io(e, path))?;
        let modified = Self::modified(&metadata, &relative)?;
        match metadata.is_dir() {
            true => Ok(Entry::directory(relative, modified)),
            false => Ok(Entry::file(relative, metadata.len(), modified)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Read;
    use std::time::{Duration, SystemTime};

    fn touch(root: &Path, path: &str, data: &[u8]) {
        let absolute = root.join(path);
        std::fs::create_dir_all(absolute.parent().unwrap()).unwrap();
        std::fs::write(absolute, data).unwrap();
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "not-a-dir.mp3", b"data");
        let err = LocalBackend::new("name", temp_dir.path().join("not-a-dir.mp3")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_relative_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let abs = temp_dir.path().join("Dune/01.mp3");
        assert_eq!(backend.relative_path(&abs).unwrap(), Path::new("Dune/01.mp3"));
        assert!(backend.relative_path("/other/file.mp3").is_err());
    }

    #[tokio::test]
    async fn test_walk_empty_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_walk_missing_root_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path().join("gone")).unwrap();
        assert!(backend.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_walk_yields_directories_before_children() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "Dune/01.mp3", b"one");
        touch(temp_dir.path(), "Dune/cover.jpg", b"jpg");
        touch(temp_dir.path(), "Series/Book 1/part.m4b", b"m4b");
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let entries = backend.list().await.unwrap();
        let position: HashMap<_, _> = entries.iter().enumerate().map(|(i, e)| (e.path.clone(), i)).collect();
        assert_eq!(entries.len(), 6);
        assert!(position[Path::new("Dune")] < position[Path::new("Dune/01.mp3")]);
        assert!(position[Path::new("Dune")] < position[Path::new("Dune/cover.jpg")]);
        assert!(position[Path::new("Series")] < position[Path::new("Series/Book 1")]);
        assert!(position[Path::new("Series/Book 1")] < position[Path::new("Series/Book 1/part.m4b")]);
        let part = entries.iter().find(|e| e.path == Path::new("Series/Book 1/part.m4b")).unwrap();
        assert!(!part.is_dir());
        assert_eq!(part.size, 3);
    }

    #[tokio::test]
    async fn test_walk_lists_a_directory_before_descending() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "Dune/01.mp3", b"one");
        touch(temp_dir.path(), "Emma/01.mp3", b"one");
        touch(temp_dir.path(), "loose.mp3", b"x");
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let entries = backend.list().await.unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths.len(), 5);
        // All three root entries first, then one book's contents, then the other's.
        let mut root: Vec<_> = paths[..3].to_vec();
        root.sort();
        assert_eq!(root, [PathBuf::from("Dune"), PathBuf::from("Emma"), PathBuf::from("loose.mp3")]);
        let dirs: Vec<_> = paths[..3].iter().filter(|p| p.extension().is_none()).collect();
        // Last directory found is descended into first.
        assert_eq!(paths[3], dirs[1].join("01.mp3"));
        assert_eq!(paths[4], dirs[0].join("01.mp3"));
    }

    #[tokio::test]
    async fn test_walk_skips_hidden_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), ".DS_Store", b"junk");
        touch(temp_dir.path(), ".trash/Old/01.mp3", b"old");
        touch(temp_dir.path(), "Dune/.01.mp3.partial", b"partial");
        touch(temp_dir.path(), "Dune/01.mp3", b"one");
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let paths: Vec<_> = backend.list().await.unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&PathBuf::from("Dune")));
        assert!(paths.contains(&PathBuf::from("Dune/01.mp3")));
    }

    #[tokio::test]
    async fn test_walk_reports_modified_time() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "Dune/01.mp3", b"one");
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        std::fs::File::options()
            .write(true)
            .open(temp_dir.path().join("Dune/01.mp3"))
            .unwrap()
            .set_modified(stamp)
            .unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let entries = backend.list().await.unwrap();
        let file = entries.iter().find(|e| !e.is_dir()).unwrap();
        assert_eq!(file.modified, UtcDateTime::from(stamp));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_walk_does_not_follow_directory_symlinks() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "Dune/01.mp3", b"one");
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("Dune/loop")).unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("Dune/01.mp3"), temp_dir.path().join("Dune/02.mp3")).unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let paths: Vec<_> = backend.list().await.unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&PathBuf::from("Dune/02.mp3")));
        assert!(!paths.iter().any(|p| p.starts_with("Dune/loop")));
    }

    #[tokio::test]
    async fn test_read_and_reader() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "Dune/cover.jpg", b"not really a jpeg");
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        assert_eq!(backend.read(Path::new("Dune/cover.jpg")).await.unwrap(), b"not really a jpeg");
        let mut reader = backend.reader(Path::new("Dune/cover.jpg")).await.unwrap();
        let mut buffer = String::new();
        reader.read_to_string(&mut buffer).unwrap();
        assert_eq!(buffer, "not really a jpeg");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let err = backend.read(Path::new("missing.mp3")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = backend.reader(Path::new("missing.mp3")).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stat() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "Dune/01.mp3", b"12345");
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let file = backend.stat(Path::new("./Dune//01.mp3")).await.unwrap();
        assert_eq!(file.path, Path::new("Dune/01.mp3"));
        assert_eq!(file.size, 5);
        assert!(backend.stat(Path::new("Dune")).await.unwrap().is_dir());
        let err = backend.stat(Path::new("Dune/02.mp3")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_path_security() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.reader(Path::new("etc/../../passwd")).await.is_err());
    }
}
