//! Scriptable lease for testing.

use super::{Denial, Grant, LeaseHandle, ResourceLease};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Grants everything unless told otherwise, and counts what it hands out so
/// tests can assert every grant was released.
///
/// ```
/// use audiohub_storage::lease::{Grant, MockLease, ResourceLease};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let lease = MockLease::default().with_denied("Dune/01.mp3");
/// assert!(matches!(lease.acquire(Path::new("Dune/01.mp3")).await, Grant::Denied(_)));
/// if let Grant::Granted(handle) = lease.acquire(Path::new("")).await {
///     lease.release(handle);
/// }
/// assert_eq!(lease.acquired(), 1);
/// assert_eq!(lease.released(), 1);
/// # }
/// ```
#[derive(Default)]
pub struct MockLease {
    next_id: AtomicU64,
    acquired: AtomicUsize,
    released: AtomicUsize,
    stale: AtomicBool,
    deny_all: bool,
    denied: HashSet<PathBuf>,
    outstanding: Mutex<HashSet<u64>>,
}
impl MockLease {
    /// Deny every acquisition as unreachable.
    pub fn denying() -> Self {
        Self {
            deny_all: true,
            ..Self::default()
        }
    }

    /// Deny acquisitions of one location as unreachable.
    pub fn with_denied(mut self, location: impl Into<PathBuf>) -> Self {
        self.denied.insert(location.into());
        self
    }

    /// Simulate the host revoking access.
    pub fn set_stale(&self, stale: bool) {
        self.stale.store(stale, Ordering::SeqCst);
    }

    /// Number of grants handed out so far.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Number of grants handed back so far.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Grants not yet handed back.
    pub fn outstanding(&self) -> usize {
        self.outstanding.lock().map(|ids| ids.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ResourceLease for MockLease {
    async fn acquire(&self, location: &Path) -> Grant {
        if self.is_stale() {
            return Grant::Denied(Denial::Stale);
        }
        if self.deny_all || self.denied.contains(location) {
            return Grant::Denied(Denial::Unreachable(location.to_path_buf()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut ids) = self.outstanding.lock() {
            ids.insert(id);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Grant::Granted(LeaseHandle::new(id, location))
    }

    fn release(&self, handle: LeaseHandle) {
        if let Ok(mut ids) = self.outstanding.lock() {
            ids.remove(&handle.id());
        }
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }
}
