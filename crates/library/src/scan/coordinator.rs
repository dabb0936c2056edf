use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::batch::{Batch, Extracted};
use crate::scan::classify::{Classifier, Discovery};
use crate::scan::error::ErrorKind;
use crate::scan::extract::{Extractor, TagExtractor};
use crate::scan::observer::{AbortReason, ScanObserver};
use crate::scan::reconcile::Reconciler;
use crate::scan::state::{ScanState, StateCell};
use crate::scan::walk;
use audiohub_cache::StoreHandle;
use audiohub_storage::BackendHandle;
use audiohub_storage::lease::{Denial, LeaseGuard, LeaseRef};
use exn::ResultExt;
use futures::StreamExt;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use time::UtcDateTime;
use tokio::sync::{Mutex, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Most extractions running at once. Zero is treated as one.
    pub concurrency: usize,
    /// Longest a single extraction may take before it counts as failed.
    pub extract_timeout: Option<Duration>,
}
impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            extract_timeout: Some(DEFAULT_EXTRACT_TIMEOUT),
        }
    }
}

/// What a completed scan did.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    /// Books the scan created or changed in the store.
    pub books: usize,
    /// Files reconciled, with or without metadata.
    pub files: usize,
    /// Files whose extraction failed.
    pub failures: usize,
    /// Files left out entirely: outside any book folder, or their store
    /// update failed.
    pub skipped: usize,
    pub last_error: Option<String>,
    pub completed_at: UtcDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(ScanSummary),
    Aborted(AbortReason),
}

struct Running {
    cancel: CancellationToken,
    finished: CancellationToken,
}

/// Owns library scans: at most one runs at a time, and starting a new one
/// cancels (and waits out) whichever is in flight.
///
/// Each scan runs on its own task. Callers hear about it through the
/// [`ScanObserver`] they pass in and the [`ScanHandle`] they get back, and
/// can watch its [`ScanState`] through [`subscribe()`](Self::subscribe).
pub struct Scanner {
    backend: BackendHandle,
    lease: LeaseRef,
    store: StoreHandle,
    extractor: Arc<dyn Extractor>,
    options: ScanOptions,
    state: Arc<StateCell>,
    current: Mutex<Option<Running>>,
}

impl Scanner {
    pub fn new(backend: BackendHandle, lease: LeaseRef, store: StoreHandle, options: ScanOptions) -> Self {
        let extractor = Arc::new(TagExtractor::new(Arc::clone(&backend), Arc::clone(&lease)));
        Self {
            backend,
            lease,
            store,
            extractor,
            options,
            state: Arc::new(StateCell::new()),
            current: Mutex::new(None),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ScanState {
        self.state.get()
    }

    /// Start a scan, cancelling and waiting for any scan already running.
    pub async fn start(&self, observer: Arc<dyn ScanObserver>) -> ScanHandle {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            tracing::info!("cancelling in-flight scan before starting a new one");
            previous.cancel.cancel();
            previous.finished.cancelled().await;
        }

        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let (sender, receiver) = oneshot::channel();
        let run = Run {
            backend: Arc::clone(&self.backend),
            lease: Arc::clone(&self.lease),
            store: Arc::clone(&self.store),
            extractor: Arc::clone(&self.extractor),
            options: self.options.clone(),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
            observer,
        };
        let done = finished.clone().drop_guard();
        tokio::spawn(async move {
            // Declared first so it drops last, after the outcome is sent.
            let _done = done;
            let outcome = run.execute().await;
            _ = sender.send(outcome);
        });

        *current = Some(Running {
            cancel: cancel.clone(),
            finished,
        });
        ScanHandle {
            cancel,
            outcome: receiver,
        }
    }

    /// Cancel the running scan, if any, and wait for it to stop.
    pub async fn cancel(&self) {
        if let Some(running) = self.current.lock().await.take() {
            running.cancel.cancel();
            running.finished.cancelled().await;
        }
    }
}

pub struct ScanHandle {
    cancel: CancellationToken,
    outcome: oneshot::Receiver<ScanOutcome>,
}

impl ScanHandle {
    /// Ask the scan to stop after the item it's currently on.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A token that cancels this scan, for use from other tasks.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn outcome(self) -> LibraryResult<ScanOutcome> {
        self.outcome.await.or_raise(|| LibraryErrorKind::Interrupted)
    }
}

struct Run {
    backend: BackendHandle,
    lease: LeaseRef,
    store: StoreHandle,
    extractor: Arc<dyn Extractor>,
    options: ScanOptions,
    state: Arc<StateCell>,
    cancel: CancellationToken,
    observer: Arc<dyn ScanObserver>,
}

#[derive(Default)]
struct Tally {
    files: usize,
    failures: usize,
    skipped: usize,
    last_error: Option<String>,
}

impl Run {
    #[instrument(name = "scan", skip_all, fields(backend = self.backend.name()))]
    async fn execute(self) -> ScanOutcome {
        tracing::info!("scan started");
        match self.run().await {
            Ok(summary) => {
                tracing::info!(
                    books = summary.books,
                    files = summary.files,
                    failures = summary.failures,
                    skipped = summary.skipped,
                    "scan complete"
                );
                self.observer.on_complete(&summary);
                self.state.advance(ScanState::Idle);
                ScanOutcome::Completed(summary)
            },
            Err(reason) => {
                tracing::info!(%reason, "scan aborted");
                self.state.advance(ScanState::Aborted);
                self.observer.on_aborted(&reason);
                ScanOutcome::Aborted(reason)
            },
        }
    }

    fn checkpoint(&self) -> Result<(), AbortReason> {
        if self.cancel.is_cancelled() {
            return Err(AbortReason::Cancelled);
        }
        if self.lease.is_stale() {
            tracing::warn!("access to the library location was revoked");
            return Err(AbortReason::ReconnectRequired(Denial::Stale));
        }
        Ok(())
    }

    fn report(&self, tally: &mut Tally, message: String) {
        self.observer.on_error(&message);
        tally.last_error = Some(message);
    }

    async fn run(&self) -> Result<ScanSummary, AbortReason> {
        let now = UtcDateTime::now();
        let mut tally = Tally::default();

        self.state.advance(ScanState::Leasing);
        let lease = LeaseGuard::acquire(&self.lease, Path::new("")).await.map_err(|denial| {
            tracing::warn!(reason = %denial, "library location is unavailable");
            AbortReason::ReconnectRequired(denial)
        })?;
        self.checkpoint()?;

        self.state.advance(ScanState::Walking);
        let mut classifier = Classifier::new(now);
        let mut reconciler = Reconciler::new(Arc::clone(&self.store), now);
        let mut jobs = vec![];
        let mut entries = pin!(walk::entries(self.backend.as_ref()));
        while let Some(entry) = entries.next().await {
            self.checkpoint()?;
            for discovery in classifier.classify(entry) {
                match discovery {
                    Discovery::Book(book) => reconciler.register(book),
                    Discovery::File(job) => jobs.push(job),
                }
            }
        }

        self.state.advance(ScanState::Classifying);
        for orphan in classifier.finish() {
            let err = ErrorKind::Classification(orphan.path.clone());
            tracing::warn!(path = %orphan.path.display(), "skipping file outside any book folder");
            self.report(&mut tally, err.to_string());
            tally.skipped += 1;
        }
        tracing::debug!(files = jobs.len(), "discovery complete");

        if !jobs.is_empty() {
            self.state.advance(ScanState::Extracting);
            let mut batch = Batch::new(
                self.extractor.as_ref(),
                jobs,
                self.options.concurrency,
                self.options.extract_timeout,
            );
            while let Some(Extracted { job, result }) = batch.next().await {
                self.state.advance(ScanState::Reconciling);
                let path = job.entry.path.display();
                let payload = match result {
                    Ok(payload) => Some(payload),
                    Err(err) if matches!(&*err, ErrorKind::Lease(Denial::Stale)) => {
                        tracing::warn!(%path, "access to the library location was revoked");
                        return Err(AbortReason::ReconnectRequired(Denial::Stale));
                    },
                    Err(err) => {
                        tracing::warn!(%path, error = %err, "extraction failed, keeping filesystem fields only");
                        tally.failures += 1;
                        let message = batch.last_error().map_or_else(|| err.to_string(), str::to_string);
                        self.report(&mut tally, message);
                        None
                    },
                };
                match reconciler.reconcile(&job, payload).await {
                    Ok(_) => tally.files += 1,
                    Err(err) => {
                        tracing::warn!(%path, error = %err, "dropping store update");
                        tally.skipped += 1;
                        self.report(&mut tally, format!("{path}: {err}"));
                    },
                }
                self.observer.on_progress(batch.completed(), batch.total());
                self.checkpoint()?;
                if !batch.is_finished() {
                    self.state.advance(ScanState::Extracting);
                }
            }
        }
        drop(lease);

        self.state.advance(ScanState::Completing);
        let completed_at = UtcDateTime::now();
        if let Err(err) = self.store.set_last_scan(completed_at).await {
            tracing::warn!(error = %err, "failed to record scan time");
            self.report(&mut tally, format!("failed to record scan time: {err}"));
        }
        if let Err(err) = self.store.flush().await {
            tracing::warn!(error = %err, "failed to flush library store");
        }

        Ok(ScanSummary {
            books: reconciler.written(),
            files: tally.files,
            failures: tally.failures,
            skipped: tally.skipped,
            last_error: tally.last_error,
            completed_at,
        })
    }
}
