use crate::scan::classify::FileJob;
use crate::scan::error::{ErrorKind, Result};
use async_trait::async_trait;
use audiohub_extract::{FileKind, MediaMetadata, read_media};
use audiohub_storage::BackendHandle;
use audiohub_storage::lease::{LeaseGuard, LeaseRef};
use exn::ResultExt;

/// What extraction found for a single file.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Media(MediaMetadata),
    /// Cover art, verbatim.
    Image(Vec<u8>),
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, job: &FileJob) -> Result<Payload>;
}

/// Reads tags from media files and raw bytes from images, holding a lease on
/// the file for exactly as long as it's being read.
pub struct TagExtractor {
    backend: BackendHandle,
    lease: LeaseRef,
}

impl TagExtractor {
    pub fn new(backend: BackendHandle, lease: LeaseRef) -> Self {
        Self { backend, lease }
    }
}

#[async_trait]
impl Extractor for TagExtractor {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %job.entry.path.display()))]
    async fn extract(&self, job: &FileJob) -> Result<Payload> {
        let path = job.entry.path.as_path();
        // Dropped on every return path, including when this future is.
        let _lease = LeaseGuard::acquire(&self.lease, path).await.map_err(ErrorKind::Lease)?;
        match job.kind {
            FileKind::Image => {
                let bytes = self.backend.read(path).await.or_raise(|| ErrorKind::Storage)?;
                Ok(Payload::Image(bytes))
            },
            FileKind::Media => {
                let reader = self.backend.reader(path).await.or_raise(|| ErrorKind::Storage)?;
                let metadata = tokio::task::spawn_blocking(move || read_media(reader))
                    .await
                    .or_raise(|| ErrorKind::Extract)?
                    .or_raise(|| ErrorKind::Extract)?;
                Ok(Payload::Media(metadata))
            },
        }
    }
}
