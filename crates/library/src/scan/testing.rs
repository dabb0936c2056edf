//! Test doubles for the scan pipeline.

use crate::scan::classify::FileJob;
use crate::scan::coordinator::ScanSummary;
use crate::scan::error::{ErrorKind, Result};
use crate::scan::extract::{Extractor, Payload};
use crate::scan::observer::{AbortReason, ScanEvent, ScanObserver};
use async_trait::async_trait;
use audiohub_cache::error::{ErrorKind as CacheErrorKind, Result as CacheResult};
use audiohub_cache::{Book, File, LastScan, LibraryStore, Repository};
use audiohub_extract::{FileKind, MediaMetadata};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use time::UtcDateTime;
use tokio::sync::Semaphore;

/// Extractor with scripted results, optional gating and concurrency tracking.
#[derive(Default)]
pub(crate) struct FakeExtractor {
    payloads: HashMap<PathBuf, Payload>,
    failing: HashSet<PathBuf>,
    hanging: HashSet<PathBuf>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl FakeExtractor {
    pub(crate) fn with_payload(mut self, path: impl Into<PathBuf>, payload: Payload) -> Self {
        self.payloads.insert(path.into(), payload);
        self
    }

    pub(crate) fn with_title(self, path: impl Into<PathBuf>, title: &str) -> Self {
        let metadata = MediaMetadata {
            title: Some(title.to_string()),
            ..MediaMetadata::default()
        };
        self.with_payload(path, Payload::Media(metadata))
    }

    pub(crate) fn failing(mut self, path: impl Into<PathBuf>) -> Self {
        self.failing.insert(path.into());
        self
    }

    pub(crate) fn hanging(mut self, path: impl Into<PathBuf>) -> Self {
        self.hanging.insert(path.into());
        self
    }

    /// Every extraction waits for a permit from `gate` before finishing.
    pub(crate) fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Most extractions ever running at once.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, job: &FileJob) -> Result<Payload> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let path = &job.entry.path;
        if self.hanging.contains(path) {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(path) {
            exn::bail!(ErrorKind::Extract);
        }
        Ok(self.payloads.get(path).cloned().unwrap_or_else(|| match job.kind {
            FileKind::Media => Payload::Media(MediaMetadata::default()),
            FileKind::Image => Payload::Image(Vec::new()),
        }))
    }
}

/// Observer that appends every notification, tagged with a run number, to a
/// log shared between runs.
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    log: Arc<Mutex<Vec<(usize, ScanEvent)>>>,
}

impl Recorder {
    pub(crate) fn observer(&self, run: usize) -> Arc<dyn ScanObserver> {
        Arc::new(Tagged { run, recorder: self.clone() })
    }

    pub(crate) fn events(&self) -> Vec<(usize, ScanEvent)> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn events_for(&self, run: usize) -> Vec<ScanEvent> {
        self.events().into_iter().filter(|(r, _)| *r == run).map(|(_, event)| event).collect()
    }

    fn push(&self, run: usize, event: ScanEvent) {
        self.log.lock().unwrap().push((run, event));
    }
}

struct Tagged {
    run: usize,
    recorder: Recorder,
}

impl ScanObserver for Tagged {
    fn on_progress(&self, completed: usize, total: usize) {
        self.recorder.push(self.run, ScanEvent::Progress { completed, total });
    }

    fn on_error(&self, message: &str) {
        self.recorder.push(self.run, ScanEvent::Error(message.to_string()));
    }

    fn on_complete(&self, summary: &ScanSummary) {
        self.recorder.push(self.run, ScanEvent::Complete(summary.clone()));
    }

    fn on_aborted(&self, reason: &AbortReason) {
        self.recorder.push(self.run, ScanEvent::Aborted(reason.clone()));
    }
}

/// Repository whose writes fail for chosen ids: every `put_file` for a failing
/// file, and only the first `put_book` for a failing book.
pub(crate) struct FailingStore {
    inner: Arc<Repository>,
    files: HashSet<PathBuf>,
    books: Mutex<HashSet<PathBuf>>,
}

impl FailingStore {
    pub(crate) fn new(inner: Arc<Repository>) -> Self {
        Self {
            inner,
            files: HashSet::new(),
            books: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn failing_file(mut self, id: impl Into<PathBuf>) -> Self {
        self.files.insert(id.into());
        self
    }

    pub(crate) fn failing_book_once(self, id: impl Into<PathBuf>) -> Self {
        self.books.lock().unwrap().insert(id.into());
        self
    }
}

#[async_trait]
impl LibraryStore for FailingStore {
    async fn get_book(&self, id: &Path) -> CacheResult<Option<Book>> {
        self.inner.get_book(id).await
    }

    async fn put_book(&self, book: &Book) -> CacheResult<()> {
        if self.books.lock().unwrap().remove(&book.id) {
            exn::bail!(CacheErrorKind::Database);
        }
        self.inner.put_book(book).await
    }

    async fn get_file(&self, id: &Path) -> CacheResult<Option<File>> {
        self.inner.get_file(id).await
    }

    async fn put_file(&self, file: &File) -> CacheResult<()> {
        if self.files.contains(&file.id) {
            exn::bail!(CacheErrorKind::Database);
        }
        self.inner.put_file(file).await
    }

    async fn flush(&self) -> CacheResult<()> {
        self.inner.flush().await
    }

    async fn last_scan(&self) -> CacheResult<LastScan> {
        self.inner.last_scan().await
    }

    async fn set_last_scan(&self, at: UtcDateTime) -> CacheResult<()> {
        self.inner.set_last_scan(at).await
    }
}
