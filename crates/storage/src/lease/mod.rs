//! Scoped access to a library location.
//!
//! Network mounts disappear, sandboxed hosts revoke access and removable
//! drives get unplugged. A [`ResourceLease`] is asked for access before any
//! work touches a location and is told when that work is done. Denial is an
//! ordinary value, not an error: the caller decides what "reconnect" means.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalLease;
#[cfg(feature = "mock")]
pub use self::mock::MockLease;
use async_trait::async_trait;
use derive_more::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type LeaseRef = Arc<dyn ResourceLease>;

/// Proof of a granted lease. Must be handed back through
/// [`ResourceLease::release`]; prefer [`LeaseGuard`] which does that on drop.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct LeaseHandle {
    id: u64,
    location: PathBuf,
}
impl LeaseHandle {
    pub fn new(id: u64, location: impl Into<PathBuf>) -> Self {
        Self { id, location: location.into() }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Location relative to the root; empty for the root itself.
    pub fn location(&self) -> &Path {
        &self.location
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Denial {
    /// The location doesn't exist or can't be listed/opened.
    #[display("location unreachable: {}", _0.display())]
    Unreachable(PathBuf),
    /// Access was revoked by the host; the location must be selected again.
    #[display("access to the library location is stale")]
    Stale,
}

#[derive(Debug)]
pub enum Grant {
    Granted(LeaseHandle),
    Denied(Denial),
}

#[async_trait]
pub trait ResourceLease: Send + Sync {
    /// Ask for access to `location` (relative to the root, empty for the
    /// root itself).
    async fn acquire(&self, location: &Path) -> Grant;

    fn release(&self, handle: LeaseHandle);

    /// Whether access has been revoked since it was granted. A stale lease
    /// denies every further acquisition.
    fn is_stale(&self) -> bool;
}

/// Releases its lease when dropped, including on early returns and when the
/// owning future is cancelled.
pub struct LeaseGuard {
    lease: LeaseRef,
    handle: Option<LeaseHandle>,
}
impl LeaseGuard {
    pub async fn acquire(lease: &LeaseRef, location: &Path) -> Result<Self, Denial> {
        match lease.acquire(location).await {
            Grant::Granted(handle) => Ok(Self {
                lease: Arc::clone(lease),
                handle: Some(handle),
            }),
            Grant::Denied(denial) => Err(denial),
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.handle.as_ref().map(LeaseHandle::location)
    }
}
impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.lease.release(handle);
        }
    }
}
