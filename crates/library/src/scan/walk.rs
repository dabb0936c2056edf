use async_stream::stream;
use audiohub_storage::{Entry, StorageBackend};
use futures::Stream;

/// Every readable entry beneath the root, in the backend's walk order.
///
/// Unreadable entries and subtrees are dropped here: the walk carries on and
/// nobody upstream hears about them beyond a debug log.
pub fn entries(backend: &dyn StorageBackend) -> impl Stream<Item = Entry> + Send + '_ {
    stream! {
        for await item in backend.walk() {
            match item {
                Ok(entry) => yield entry,
                Err(err) => {
                    tracing::debug!(backend = backend.name(), error = %err, "skipping unreadable entry");
                },
            }
        }
    }
}
