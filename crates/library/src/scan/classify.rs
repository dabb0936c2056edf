use audiohub_cache::Book;
use audiohub_extract::FileKind;
use audiohub_storage::Entry;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use time::UtcDateTime;

/// A file that needs its metadata (or bytes) extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    /// Id of the owning book.
    pub book: PathBuf,
    pub kind: FileKind,
    pub entry: Entry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    Book(Book),
    File(FileJob),
}

/// Turns walk entries into books and extraction jobs.
///
/// Every directory is a book; a file belongs to the book of its immediate
/// parent directory. Files that arrive before their directory are held back
/// until it shows up, so the output never mentions a book before announcing
/// it, whatever order the walk produces.
pub struct Classifier {
    now: UtcDateTime,
    books: HashSet<PathBuf>,
    deferred: BTreeMap<PathBuf, Vec<(FileKind, Entry)>>,
}

impl Classifier {
    /// `now` becomes the `added` time of every book discovered.
    pub fn new(now: UtcDateTime) -> Self {
        Self {
            now,
            books: HashSet::new(),
            deferred: BTreeMap::new(),
        }
    }

    pub fn classify(&mut self, entry: Entry) -> Vec<Discovery> {
        if entry.is_dir() {
            if !self.books.insert(entry.path.clone()) {
                return vec![];
            }
            let mut out = vec![Discovery::Book(Book::new(entry.path.clone(), self.now))];
            if let Some(waiting) = self.deferred.remove(&entry.path) {
                out.extend(waiting.into_iter().map(|(kind, file)| {
                    Discovery::File(FileJob {
                        book: entry.path.clone(),
                        kind,
                        entry: file,
                    })
                }));
            }
            return out;
        }

        let Some(kind) = FileKind::from_extension(entry.extension()) else {
            tracing::trace!(path = %entry.path.display(), "ignoring unsupported file");
            return vec![];
        };
        let parent = entry.parent().to_path_buf();
        if self.books.contains(&parent) {
            return vec![Discovery::File(FileJob { book: parent, kind, entry })];
        }
        self.deferred.entry(parent).or_default().push((kind, entry));
        vec![]
    }

    /// Files whose book never appeared, sorted by path.
    pub fn finish(self) -> Vec<Entry> {
        let mut orphans: Vec<Entry> = self.deferred.into_values().flatten().map(|(_, entry)| entry).collect();
        orphans.sort_by(|a, b| a.path.cmp(&b.path));
        orphans
    }
}
