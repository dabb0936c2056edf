//! Library scanning.
//!
//! A scan leases the library location, walks it, turns folders into books
//! and their audio and image files into extraction jobs, extracts with
//! bounded concurrency and reconciles each result into the library store as
//! soon as it arrives. [`Scanner`] runs all of that as a single cancellable
//! task.

mod batch;
mod classify;
mod coordinator;
pub mod error;
mod extract;
mod observer;
mod reconcile;
mod state;
#[cfg(test)]
mod testing;
mod walk;

pub use self::batch::{Batch, Extracted};
pub use self::classify::{Classifier, Discovery, FileJob};
pub use self::coordinator::{
    DEFAULT_CONCURRENCY, DEFAULT_EXTRACT_TIMEOUT, ScanHandle, ScanOptions, ScanOutcome, ScanSummary, Scanner,
};
pub use self::extract::{Extractor, Payload, TagExtractor};
pub use self::observer::{AbortReason, ChannelObserver, NoopObserver, ScanEvent, ScanObserver};
pub use self::reconcile::{BookState, Reconciler, merge_book, merge_file, observed_file};
pub use self::state::ScanState;
pub use self::walk::entries;
