//! Lease over a directory on the local filesystem.

use super::{Denial, Grant, LeaseHandle, ResourceLease};
use crate::path::validate as validate_path;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tokio::fs;

/// Grants access to a location beneath `root` only when it's reachable right
/// now: the root (and the location) must exist, directories must be listable
/// and files openable. There's no host-level permission model to consult, so
/// revocation is manual via [`revoke()`](Self::revoke).
pub struct LocalLease {
    root: PathBuf,
    next_id: AtomicU64,
    active: AtomicUsize,
    revoked: AtomicBool,
}
impl LocalLease {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_id: AtomicU64::new(1),
            active: AtomicUsize::new(0),
            revoked: AtomicBool::new(false),
        }
    }

    /// Number of handles granted and not yet released.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Mark access as revoked; every later acquisition is denied as stale.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Connectivity probe: does the location exist, and can it be listed
    /// (directories) or opened (files)?
    pub async fn can_access(&self, location: &Path) -> bool {
        let Some(absolute) = self.absolute(location) else {
            return false;
        };
        match fs::metadata(&absolute).await {
            Ok(metadata) if metadata.is_dir() => fs::read_dir(&absolute).await.is_ok(),
            Ok(_) => fs::File::open(&absolute).await.is_ok(),
            Err(_) => false,
        }
    }

    fn absolute(&self, location: &Path) -> Option<PathBuf> {
        if location.as_os_str().is_empty() {
            return Some(self.root.clone());
        }
        validate_path(location).ok().map(|relative| self.root.join(relative))
    }
}

#[async_trait]
impl ResourceLease for LocalLease {
    async fn acquire(&self, location: &Path) -> Grant {
        if self.is_stale() {
            return Grant::Denied(Denial::Stale);
        }
        if !self.can_access(location).await {
            tracing::debug!(root = %self.root.display(), location = %location.display(), "Location unreachable");
            return Grant::Denied(Denial::Unreachable(location.to_path_buf()));
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        Grant::Granted(LeaseHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst), location))
    }

    fn release(&self, handle: LeaseHandle) {
        // Saturating: releasing a handle from a different lease must not wrap.
        let _ = self.active.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        tracing::trace!(id = handle.id(), "Lease released");
    }

    fn is_stale(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}
