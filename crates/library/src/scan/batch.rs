use crate::scan::classify::FileJob;
use crate::scan::error::{ErrorKind, Result};
use crate::scan::extract::{Extractor, Payload};
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use std::collections::VecDeque;
use std::time::Duration;

/// A job that has finished extracting, successfully or not.
pub struct Extracted {
    pub job: FileJob,
    pub result: Result<Payload>,
}

/// Runs extraction jobs with bounded concurrency.
///
/// At most `min(jobs, cap)` jobs (and never fewer than one) are in flight at
/// once; as each finishes, the next queued job takes its place. Results come
/// back in completion order, not submission order. A failed job is just
/// another result: it never stops its siblings.
pub struct Batch<'a> {
    extractor: &'a dyn Extractor,
    timeout: Option<Duration>,
    queued: VecDeque<FileJob>,
    running: FuturesUnordered<BoxFuture<'a, Extracted>>,
    total: usize,
    completed: usize,
    last_error: Option<String>,
}

impl<'a> Batch<'a> {
    pub fn new(extractor: &'a dyn Extractor, jobs: Vec<FileJob>, cap: usize, timeout: Option<Duration>) -> Self {
        let total = jobs.len();
        let limit = total.min(cap).max(1);
        let mut batch = Self {
            extractor,
            timeout,
            queued: jobs.into(),
            running: FuturesUnordered::new(),
            total,
            completed: 0,
            last_error: None,
        };
        for _ in 0..limit {
            batch.promote();
        }
        batch
    }

    fn promote(&mut self) {
        let Some(job) = self.queued.pop_front() else {
            return;
        };
        let extractor = self.extractor;
        let timeout = self.timeout;
        self.running.push(Box::pin(async move {
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, extractor.extract(&job)).await {
                    Ok(result) => result,
                    Err(_elapsed) => Err(ErrorKind::Timeout(limit).into()),
                },
                None => extractor.extract(&job).await,
            };
            Extracted { job, result }
        }));
    }

    /// Wait for the next job to finish. `None` once every job has.
    pub async fn next(&mut self) -> Option<Extracted> {
        let done = self.running.next().await?;
        self.completed += 1;
        if let Err(err) = &done.result {
            self.last_error = Some(format!("{}: {err}", done.job.entry.path.display()));
        }
        self.promote();
        Some(done)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }

    /// Most recent failure, prefixed with the file it happened to.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
